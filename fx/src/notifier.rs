//! "Rates updated" notifications.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ratebook_common::ExchangeRateSource;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Emitted after a refresh installed new rate tables.
#[derive(Debug, Clone, PartialEq)]
pub struct RatesUpdated {
    /// Sources whose tables were replaced.
    pub sources: Vec<ExchangeRateSource>,
    pub at: DateTime<Utc>,
}

type Observer = Arc<dyn Fn(&RatesUpdated) + Send + Sync>;

/// One-shot broadcast of rate updates.
///
/// Async consumers subscribe to a broadcast channel; synchronous consumers
/// register a callback that runs on the notifying task.
pub struct RateNotifier {
    sender: broadcast::Sender<RatesUpdated>,
    observers: RwLock<Vec<Observer>>,
}

impl RateNotifier {
    /// Create a notifier whose channel buffers `capacity` events per slow receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to future updates.
    pub fn subscribe(&self) -> broadcast::Receiver<RatesUpdated> {
        self.sender.subscribe()
    }

    /// Register a callback run on every update.
    pub fn observe<F>(&self, observer: F)
    where
        F: Fn(&RatesUpdated) + Send + Sync + 'static,
    {
        self.observers.write().push(Arc::new(observer));
    }

    /// Deliver an update to every subscriber and observer.
    pub fn notify(&self, event: RatesUpdated) {
        // Snapshot so callbacks may register further observers.
        let observers: Vec<Observer> = self.observers.read().clone();
        for observer in &observers {
            observer(&event);
        }

        // Sending only fails when nobody is subscribed.
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(receivers, observers = observers.len(), "Rates updated notification sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> RatesUpdated {
        RatesUpdated {
            sources: vec![ExchangeRateSource::Ecb],
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_update() {
        let notifier = RateNotifier::new(4);
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();

        let sent = event();
        notifier.notify(sent.clone());

        assert_eq!(rx1.recv().await.unwrap(), sent);
        assert_eq!(rx2.recv().await.unwrap(), sent);
    }

    #[test]
    fn test_observers_called() {
        let notifier = RateNotifier::new(4);
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        notifier.observe(move |e| {
            assert_eq!(e.sources, vec![ExchangeRateSource::Ecb]);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(event());
        notifier.notify(event());

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notify_without_listeners() {
        let notifier = RateNotifier::new(1);
        notifier.notify(event());
    }
}
