//! Link attribute reconciliation.

use std::collections::HashSet;

use tracing::{debug, instrument};

use arbor_core::{
    Attribute, AttributeId, ContentAccess, FoundLink, Lifecycle, LifecycleFilter, Note, NoteId,
    Result,
};

use crate::link_extraction::extract_links;
use crate::NoteTree;

impl NoteTree {
    /// Reconcile the derived link attributes of `note` with `content` and
    /// return the content to persist.
    ///
    /// Matching attributes are kept (revived when deleted), missing ones
    /// are created, and live link attributes no longer present are
    /// soft-deleted. Re-running on unchanged content writes nothing.
    #[instrument(skip_all, fields(subsystem = "tree", op = "sync_links", note_id = %note.id))]
    pub(crate) async fn sync_links(
        &self,
        note: &Note,
        content: String,
        access: &ContentAccess,
    ) -> Result<String> {
        if !note.note_type.carries_links() || !note.is_content_available(access) {
            return Ok(content);
        }

        let extracted = extract_links(note.note_type, content)?;

        let mut existing: Vec<Attribute> = self
            .repos
            .attributes
            .owned_by(&note.id, LifecycleFilter::Any)
            .await?
            .into_iter()
            .filter(|a| a.link_kind().is_some())
            .collect();
        let mut kept: HashSet<AttributeId> = HashSet::new();
        let mut created = 0usize;

        for link in &extracted.links {
            if !self.link_target_exists(link).await? {
                continue;
            }

            if let Some(attribute) = find_match(&mut existing, link) {
                if attribute.lifecycle.is_deleted() {
                    attribute.lifecycle = Lifecycle::Live;
                    attribute.utc_date_modified = self.now();
                    self.repos.attributes.save(attribute).await?;
                }
                kept.insert(attribute.id.clone());
                continue;
            }

            let attribute = Attribute::new(
                note.id.clone(),
                link.kind.attribute_type(),
                link.kind.attribute_name(),
                link.value.clone(),
                self.now(),
            );
            self.repos.attributes.save(&attribute).await?;
            kept.insert(attribute.id.clone());
            existing.push(attribute);
            created += 1;
        }

        let mut removed = 0usize;
        for attribute in existing
            .iter_mut()
            .filter(|a| a.lifecycle.is_live() && !kept.contains(&a.id))
        {
            attribute.lifecycle = Lifecycle::Deleted(None);
            attribute.utc_date_modified = self.now();
            self.repos.attributes.save(attribute).await?;
            removed += 1;
        }

        debug!(
            result_count = extracted.links.len(),
            created, removed, "Link attributes reconciled"
        );
        Ok(extracted.content)
    }

    /// Note-targeting links must point at a live note.
    async fn link_target_exists(&self, link: &FoundLink) -> Result<bool> {
        if !link.kind.targets_note() {
            return Ok(true);
        }
        let target = self
            .repos
            .notes
            .get(&NoteId::from(link.value.as_str()))
            .await?;
        Ok(target.is_some_and(|t| !t.is_deleted()))
    }
}

/// Existing attribute storing `link`, preferring a live one.
fn find_match<'a>(existing: &'a mut [Attribute], link: &FoundLink) -> Option<&'a mut Attribute> {
    let index = existing
        .iter()
        .position(|a| link.matches(a) && a.lifecycle.is_live())
        .or_else(|| existing.iter().position(|a| link.matches(a)))?;
    existing.get_mut(index)
}
