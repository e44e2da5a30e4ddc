//! Backend notifications
//!
//! Backends push `read`/`save`/`expire`/`clear` events to any number of
//! subscribers. Nothing depends on these for correctness.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

// == Cache Event ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Read(String),
    Save(String),
    Expire(String),
    Clear,
}

// == Event Bus ==
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CacheEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event; having no subscribers is fine.
    pub fn emit(&self, event: CacheEvent) {
        let _ = self.sender.send(event);
    }

    pub fn read(&self, key: &str) {
        self.emit(CacheEvent::Read(key.to_string()));
    }

    pub fn save(&self, key: &str) {
        self.emit(CacheEvent::Save(key.to_string()));
    }

    pub fn expire(&self, key: &str) {
        self.emit(CacheEvent::Expire(key.to_string()));
    }

    pub fn clear(&self) {
        self.emit(CacheEvent::Clear);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.save("a");
        bus.read("a");
        bus.clear();

        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Save("a".to_string()));
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Read("a".to_string()));
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Clear);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.expire("nobody-listens");
    }
}
