//! Recording notification sink

use mapbridge_core::{Message, MessageHandle, NotificationSink};
use std::sync::{Mutex, MutexGuard};
use tokio::{
    sync::Notify,
    time::{timeout, Duration, Instant},
};

/// Sink that keeps every delivered message for later inspection
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<Message>>,
    delivered: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// How many times a message with this handle was delivered
    pub fn count_for(&self, handle: &MessageHandle) -> usize {
        self.lock().iter().filter(|m| &m.handle == handle).count()
    }

    /// Wait until at least `count` messages arrived; false on timeout
    pub async fn wait_for(&self, count: usize, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            let notified = self.delivered.notified();
            if self.len() >= count {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || timeout(remaining, notified).await.is_err() {
                return self.len() >= count;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSink for RecordingSink {
    fn show_message_notification(&self, message: Message) {
        self.lock().push(message);
        self.delivered.notify_waiters();
    }
}
