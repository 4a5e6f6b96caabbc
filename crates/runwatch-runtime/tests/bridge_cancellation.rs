use std::sync::Arc;
use std::thread;
use std::time::Duration;

use runwatch_runtime::{EventBridge, Provider, Scope, Subscription};
use runwatch_testing::assertions::{assert_strictly_increasing, output_ordinals};
use runwatch_testing::fixtures::line;
use runwatch_testing::ScriptedProvider;
use runwatch_types::{Event, InstanceId};

#[test]
fn test_drained_count_stops_growing_after_cancel() {
    let id = InstanceId::new("etl", "r1");
    let provider = Arc::new(ScriptedProvider::new());
    let dyn_provider: Arc<dyn Provider> = provider.clone();
    let bridge = EventBridge::new(16);

    let mut subscription =
        Subscription::open(dyn_provider, Scope::Instance(id.clone()), &bridge).unwrap();
    let publisher = provider.issued_publishers().remove(0);

    let producer_id = id.clone();
    let producer = thread::spawn(move || {
        let mut ordinal = 0;
        loop {
            ordinal += 1;
            let event = Event::OutputAppended {
                instance_id: producer_id.clone(),
                line: line(ordinal, None),
            };
            if publisher.publish(event).is_err() {
                return ordinal;
            }
        }
    });

    let mut drained = Vec::new();
    while drained.len() < 100 {
        drained.extend(bridge.drain());
        thread::yield_now();
    }

    subscription.cancel();
    subscription.cancel();
    let before = drained.len();

    // Unblock a producer parked on the full queue so it observes Closed
    for _ in 0..5 {
        drained.extend(bridge.drain());
        thread::sleep(Duration::from_millis(5));
    }
    let stopped_at = producer.join().unwrap();

    assert_eq!(drained.len(), before);
    assert!(stopped_at > 100);
    assert!(!subscription.is_active());

    let ordinals = output_ordinals(&drained, &id);
    assert_strictly_increasing(&ordinals).unwrap();
    assert_eq!(ordinals.first(), Some(&1));
}

#[test]
fn test_refused_subscription_is_not_left_open() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.refuse_subscribe();
    let dyn_provider: Arc<dyn Provider> = provider.clone();
    let bridge = EventBridge::new(4);

    assert!(Subscription::open(dyn_provider, Scope::Environment, &bridge).is_err());
    let publisher = provider.issued_publishers();
    assert!(publisher.is_empty());
}
