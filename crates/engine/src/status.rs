//! Human-readable progress notifications

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Receives status text as the engine makes progress
pub trait StatusListener: Send + Sync {
    fn on_status(&self, text: &str);
}

impl<F> StatusListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_status(&self, text: &str) {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out of status text to every subscribed listener, in subscription order
#[derive(Default)]
pub struct StatusChannel {
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn StatusListener>)>>,
    next_id: AtomicU64,
}

impl StatusChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn StatusListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, listener));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    pub fn fire(&self, text: &str) {
        info!(status = %text, "job status");
        // Snapshot so listeners may subscribe or unsubscribe from the callback
        let listeners: Vec<Arc<dyn StatusListener>> =
            self.listeners().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener.on_status(text);
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Arc<dyn StatusListener>)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_reaches_all_listeners_in_order() {
        let channel = StatusChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let a = seen.clone();
        channel.subscribe(Arc::new(move |text: &str| a.lock().unwrap().push(format!("a:{text}"))));
        let b = seen.clone();
        channel.subscribe(Arc::new(move |text: &str| b.lock().unwrap().push(format!("b:{text}"))));

        channel.fire("Job complete.");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:Job complete.".to_string(), "b:Job complete.".to_string()]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let channel = StatusChannel::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let id = channel.subscribe(Arc::new(move |_: &str| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        channel.fire("one");
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.fire("two");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(channel.listener_count(), 0);
    }
}
