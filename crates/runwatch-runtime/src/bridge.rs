//! Cross-thread delivery of provider events into the single render loop.
//!
//! Producers hold a [`Publisher`] and may call it from any thread. The render
//! loop owns the [`EventBridge`] and calls [`EventBridge::drain`] once per tick.
//! The queue is bounded; a full queue blocks the producer instead of dropping.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};

use runwatch_types::{Event, InstanceId, OutputLine, RawOutputLine};
use thiserror::Error;

/// What the render loop receives from a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(Event),
    /// The producer stopped delivering (disconnect, failure or panic)
    Lost { reason: String },
}

/// Returned to a producer whose subscription has been released or lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscription closed")]
pub struct Closed;

/// Shared cancellation state of one subscription.
///
/// Every queued envelope carries its token, so cancelling also discards
/// anything the producer managed to enqueue before noticing.
#[derive(Debug)]
pub struct SubscriptionToken {
    id: u64,
    cancelled: AtomicBool,
    lost: AtomicBool,
}

impl SubscriptionToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct BridgeStats {
    published: AtomicU64,
    delivered: AtomicU64,
    /// Envelopes discarded because their subscription was already cancelled
    discarded: AtomicU64,
    malformed: AtomicU64,
}

impl BridgeStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

struct Envelope {
    token: Arc<SubscriptionToken>,
    delivery: Delivery,
}

pub struct EventBridge {
    tx: SyncSender<Envelope>,
    rx: Receiver<Envelope>,
    stats: Arc<BridgeStats>,
    next_id: AtomicU64,
}

impl EventBridge {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = sync_channel(capacity.max(1));
        Self {
            tx,
            rx,
            stats: Arc::new(BridgeStats::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// New publisher bound to a fresh subscription token.
    pub fn publisher(&self) -> Publisher {
        let token = Arc::new(SubscriptionToken {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            cancelled: AtomicBool::new(false),
            lost: AtomicBool::new(false),
        });
        Publisher {
            tx: self.tx.clone(),
            token,
            stats: Arc::clone(&self.stats),
        }
    }

    /// Everything enqueued since the last drain, in enqueue order.
    ///
    /// Must only be called from the render loop.
    pub fn drain(&self) -> Vec<Delivery> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    if envelope.token.is_cancelled() {
                        self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    out.push(envelope.delivery);
                }
                // The bridge holds its own sender, so Disconnected cannot happen
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Producer handle. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct Publisher {
    tx: SyncSender<Envelope>,
    token: Arc<SubscriptionToken>,
    stats: Arc<BridgeStats>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("subscription", &self.token.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Publisher {
    pub fn token(&self) -> Arc<SubscriptionToken> {
        Arc::clone(&self.token)
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.token.lost.load(Ordering::SeqCst)
    }

    /// Enqueue an event. Blocks while the queue is full.
    pub fn publish(&self, event: Event) -> Result<(), Closed> {
        if self.is_closed() {
            return Err(Closed);
        }
        self.send(Delivery::Event(event))?;
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Validate a producer line and publish it as `OutputAppended`.
    ///
    /// A line without an ordinal is dropped and counted; the subscription
    /// stays open.
    pub fn publish_output(&self, instance_id: InstanceId, raw: RawOutputLine) -> Result<(), Closed> {
        match OutputLine::try_from(raw) {
            Ok(line) => self.publish(Event::OutputAppended { instance_id, line }),
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(instance = %instance_id, error = %e, "dropped malformed output line");
                Ok(())
            }
        }
    }

    /// Signal that delivery has stopped. Later publishes fail with [`Closed`].
    pub fn disconnect(&self, reason: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let reason = reason.into();
        tracing::info!(subscription = self.token.id, %reason, "publisher disconnected");
        let _ = self.send(Delivery::Lost { reason });
        self.token.lost.store(true, Ordering::SeqCst);
    }

    /// Run a producer body, converting an error or panic into a disconnect.
    pub fn supervise<F>(&self, f: F)
    where
        F: FnOnce(&Publisher) -> crate::Result<()>,
    {
        match catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.disconnect(e.to_string()),
            Err(panic_err) => {
                let panic_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "producer panicked with unknown error".to_string()
                };
                tracing::warn!(subscription = self.token.id, panic = %panic_msg, "producer panicked");
                self.disconnect(format!("producer panicked: {}", panic_msg));
            }
        }
    }

    fn send(&self, delivery: Delivery) -> Result<(), Closed> {
        self.tx
            .send(Envelope {
                token: Arc::clone(&self.token),
                delivery,
            })
            .map_err(|_| Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::thread;

    fn output(job: &str, ordinal: u64) -> Event {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Event::OutputAppended {
            instance_id: InstanceId::new(job, "r1"),
            line: OutputLine::new(ordinal, t, None, format!("{} #{}", job, ordinal)),
        }
    }

    fn ordinals_for(deliveries: &[Delivery], job: &str) -> Vec<u64> {
        deliveries
            .iter()
            .filter_map(|d| match d {
                Delivery::Event(Event::OutputAppended { instance_id, line })
                    if instance_id.job_id == job =>
                {
                    Some(line.ordinal)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_per_instance_order_across_threads() {
        let bridge = EventBridge::new(8);
        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|job| {
                let publisher = bridge.publisher();
                thread::spawn(move || {
                    for ordinal in 1..=50 {
                        publisher.publish(output(job, ordinal)).unwrap();
                    }
                })
            })
            .collect();

        let mut all = Vec::new();
        while all.len() < 150 {
            all.extend(bridge.drain());
            thread::yield_now();
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let expected: Vec<u64> = (1..=50).collect();
        for job in ["a", "b", "c"] {
            assert_eq!(ordinals_for(&all, job), expected);
        }
    }

    #[test]
    fn test_cancelled_token_stops_delivery() {
        let bridge = EventBridge::new(16);
        let publisher = bridge.publisher();
        let token = publisher.token();

        publisher.publish(output("a", 1)).unwrap();
        publisher.publish(output("a", 2)).unwrap();
        assert!(token.cancel());
        assert!(!token.cancel());

        assert_eq!(publisher.publish(output("a", 3)), Err(Closed));
        assert!(bridge.drain().is_empty());
        assert_eq!(bridge.stats().discarded(), 2);
    }

    #[test]
    fn test_full_queue_blocks_producer_without_dropping() {
        let bridge = EventBridge::new(1);
        let publisher = bridge.publisher();
        let producer = thread::spawn(move || {
            for ordinal in 1..=20 {
                publisher.publish(output("a", ordinal)).unwrap();
            }
        });

        let mut all = Vec::new();
        while all.len() < 20 {
            all.extend(bridge.drain());
            thread::yield_now();
        }
        producer.join().unwrap();

        assert_eq!(ordinals_for(&all, "a"), (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_malformed_output_is_counted_not_delivered() {
        let bridge = EventBridge::new(4);
        let publisher = bridge.publisher();
        let raw = RawOutputLine {
            ordinal: None,
            timestamp: Utc::now(),
            phase_id: None,
            text: "broken".to_string(),
        };

        assert!(publisher.publish_output(InstanceId::new("a", "r1"), raw).is_ok());
        assert!(bridge.drain().is_empty());
        assert_eq!(bridge.stats().malformed(), 1);
        assert!(!publisher.is_closed());
    }

    #[test]
    fn test_supervise_converts_panic_into_lost() {
        let bridge = EventBridge::new(4);
        let publisher = bridge.publisher();

        publisher.supervise(|p| {
            p.publish(output("a", 1)).ok();
            panic!("engine exploded");
        });

        let drained = bridge.drain();
        assert_eq!(drained.len(), 2);
        match &drained[1] {
            Delivery::Lost { reason } => assert!(reason.contains("engine exploded")),
            other => panic!("expected Lost, got {:?}", other),
        }
        assert!(publisher.is_closed());
    }

    #[test]
    fn test_supervise_converts_error_into_lost() {
        let bridge = EventBridge::new(4);
        let publisher = bridge.publisher();

        publisher.supervise(|_| Err(crate::Error::Provider("connection reset".to_string())));

        assert_eq!(
            bridge.drain(),
            vec![Delivery::Lost {
                reason: "Provider error: connection reset".to_string()
            }]
        );
    }
}
