//! Progress reporting for long-running cascades.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use arbor_core::{defaults, new_entity_id, EventBus, ProgressSink, TreeEvent};

/// Counts progress ticks of one task and publishes throttled
/// [`TreeEvent::TaskProgress`] notifications.
#[derive(Debug)]
pub struct TaskContext {
    task_id: String,
    task_type: String,
    events: EventBus,
    count: AtomicU64,
    throttle: Duration,
    last_emitted: Mutex<Option<Instant>>,
}

impl TaskContext {
    pub fn new(task_type: impl Into<String>, events: EventBus) -> Self {
        Self {
            task_id: new_entity_id(),
            task_type: task_type.into(),
            events,
            count: AtomicU64::new(0),
            throttle: Duration::from_millis(defaults::TASK_PROGRESS_THROTTLE_MS),
            last_emitted: Mutex::new(None),
        }
    }

    /// Override the minimum gap between two progress events.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn progress_count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    fn should_emit(&self) -> bool {
        let now = Instant::now();
        let mut last = self
            .last_emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *last {
            Some(at) if now.duration_since(at) < self.throttle => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl ProgressSink for TaskContext {
    fn increase_progress_count(&self) {
        let progress_count = self.count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.should_emit() {
            self.events.emit(TreeEvent::TaskProgress {
                task_id: self.task_id.clone(),
                task_type: self.task_type.clone(),
                progress_count,
            });
        }
    }
}
