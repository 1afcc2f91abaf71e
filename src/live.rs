//! A minimal in-process publish/subscribe primitive for live snapshots.
//!
//! A [Subscription] is the receiving end of an unbounded channel, optionally
//! paired with the task producing its values. Producers never wait on slow
//! consumers. Dropping or [unsubscribing](Subscription::unsubscribe) stops the
//! producer task and releases whatever it holds, including any upstream
//! subscriptions it was reading from.

use std::{future::Future, sync::Arc};

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

/// A complete, immutable, point-in-time set of records of one kind.
///
/// Each snapshot replaces the previous one; it is never a delta.
pub type Snapshot<T> = Arc<[T]>;

/// A live stream of complete snapshots.
pub type SnapshotStream<T> = Subscription<Snapshot<T>>;

/// The sending half of a [Subscription].
#[derive(Debug)]
pub struct Publisher<V> {
    sender: UnboundedSender<V>,
}

impl<V> Clone for Publisher<V> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<V> Publisher<V> {
    /// Deliver `value` to the subscriber.
    ///
    /// Returns `false` once the subscriber has gone away, in which case the
    /// producer should stop.
    pub fn publish(&self, value: V) -> bool {
        self.sender.send(value).is_ok()
    }

    /// Wait until the subscriber has gone away.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

/// The receiving half of a live stream.
#[derive(Debug)]
pub struct Subscription<V> {
    receiver: UnboundedReceiver<V>,
    task: Option<JoinHandle<()>>,
}

/// Create a publisher and a subscription without a producer task.
///
/// Useful when values come from outside a task, e.g. in tests.
pub fn channel<V>() -> (Publisher<V>, Subscription<V>) {
    let (sender, receiver) = unbounded_channel();

    (
        Publisher { sender },
        Subscription {
            receiver,
            task: None,
        },
    )
}

impl<V: Send + 'static> Subscription<V> {
    /// Spawn `producer` on the current tokio runtime and subscribe to what it
    /// publishes.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(Publisher<V>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (publisher, mut subscription) = channel();
        subscription.task = Some(tokio::spawn(producer(publisher)));
        subscription
    }

    /// Transform every value of this stream.
    pub fn map<U, F>(mut self, mut transform: F) -> Subscription<U>
    where
        U: Send + 'static,
        F: FnMut(V) -> U + Send + 'static,
    {
        Subscription::spawn(move |publisher| async move {
            while let Some(value) = self.next().await {
                if !publisher.publish(transform(value)) {
                    break;
                }
            }
        })
    }
}

impl<V> Subscription<V> {
    /// Wait for the next value.
    ///
    /// Returns `None` once the subscription has been cancelled or the
    /// producer has finished and every buffered value has been read.
    pub async fn next(&mut self) -> Option<V> {
        self.receiver.recv().await
    }

    /// Take the next value if one is already buffered.
    pub fn try_next(&mut self) -> Option<V> {
        self.receiver.try_recv().ok()
    }

    /// Skip to the most recent buffered value, waiting for one if none is
    /// buffered yet.
    pub async fn latest(&mut self) -> Option<V> {
        let mut latest = self.next().await?;

        while let Some(value) = self.try_next() {
            latest = value;
        }

        Some(latest)
    }

    /// Stop further deliveries and release the producer.
    ///
    /// Values that were published but not yet read are discarded, so
    /// [Subscription::next] returns `None` straight away afterwards. Calling
    /// this more than once has no further effect.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("subscription cancelled");
        }

        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }

    /// Whether values may still arrive.
    ///
    /// This is `false` after [Subscription::unsubscribe] and also once every
    /// publisher has been dropped, even if buffered values remain to be read.
    pub fn is_active(&self) -> bool {
        !self.receiver.is_closed()
    }
}

impl<V> Drop for Subscription<V> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Combine two streams, emitting the latest value of each whenever either
/// one emits.
///
/// Nothing is emitted until both sides have produced a value. After that,
/// every value from either side triggers an emission paired with the most
/// recent value from the other side. No relative ordering between the two
/// inputs is assumed. The combined stream ends once both inputs have ended.
pub fn combine_latest<A, B>(
    mut left: Subscription<A>,
    mut right: Subscription<B>,
) -> Subscription<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    Subscription::spawn(move |publisher| async move {
        let mut latest_left: Option<A> = None;
        let mut latest_right: Option<B> = None;
        let mut left_done = false;
        let mut right_done = false;

        while !(left_done && right_done) {
            tokio::select! {
                value = left.next(), if !left_done => match value {
                    Some(value) => latest_left = Some(value),
                    None => {
                        left_done = true;
                        continue;
                    }
                },
                value = right.next(), if !right_done => match value {
                    Some(value) => latest_right = Some(value),
                    None => {
                        right_done = true;
                        continue;
                    }
                },
            }

            let (Some(left_value), Some(right_value)) = (&latest_left, &latest_right) else {
                continue;
            };

            if !publisher.publish((left_value.clone(), right_value.clone())) {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Subscription, channel, combine_latest};

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn delivers_values_in_order() {
        let (publisher, mut subscription) = channel();

        publisher.publish(1);
        publisher.publish(2);

        assert_eq!(subscription.next().await, Some(1));
        assert_eq!(subscription.next().await, Some(2));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let (publisher, mut subscription) = channel();

        subscription.unsubscribe();
        subscription.unsubscribe();

        assert!(!subscription.is_active());
        assert!(!publisher.publish(1));
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn unsubscribe_discards_queued_values() {
        let (publisher, mut subscription) = channel();

        publisher.publish(1);
        publisher.publish(2);
        subscription.unsubscribe();

        assert_eq!(subscription.try_next(), None);
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn finished_producer_is_not_active() {
        let (publisher, subscription) = channel::<u32>();

        drop(publisher);

        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn dropping_the_subscription_stops_the_producer() {
        let (probe, mut probe_rx) = channel::<()>();
        let subscription = Subscription::<u32>::spawn(move |publisher| async move {
            publisher.closed().await;
            probe.publish(());
        });

        drop(subscription);

        // The producer is aborted, so the probe sender is dropped without sending.
        assert_eq!(probe_rx.next().await, None);
    }

    #[tokio::test]
    async fn latest_skips_stale_values() {
        let (publisher, mut subscription) = channel();

        publisher.publish("old");
        publisher.publish("new");

        assert_eq!(subscription.latest().await, Some("new"));
    }

    #[tokio::test]
    async fn combine_latest_waits_for_both_sides() {
        let (left, left_rx) = channel();
        let (right, right_rx) = channel();
        let mut combined = combine_latest(left_rx, right_rx);

        left.publish(1);
        settle().await;
        assert_eq!(combined.try_next(), None);

        right.publish("a");
        assert_eq!(combined.next().await, Some((1, "a")));
    }

    #[tokio::test]
    async fn combine_latest_reemits_when_either_side_changes() {
        let (left, left_rx) = channel();
        let (right, right_rx) = channel();
        let mut combined = combine_latest(left_rx, right_rx);

        left.publish(1);
        right.publish("a");
        assert_eq!(combined.next().await, Some((1, "a")));

        right.publish("b");
        assert_eq!(combined.next().await, Some((1, "b")));

        left.publish(2);
        assert_eq!(combined.next().await, Some((2, "b")));
    }

    #[tokio::test]
    async fn combine_latest_keeps_going_when_one_side_ends() {
        let (left, left_rx) = channel();
        let (right, right_rx) = channel();
        let mut combined = combine_latest(left_rx, right_rx);

        left.publish(1);
        right.publish("a");
        assert_eq!(combined.next().await, Some((1, "a")));

        drop(left);
        right.publish("b");
        assert_eq!(combined.next().await, Some((1, "b")));

        drop(right);
        assert_eq!(combined.next().await, None);
    }

    #[tokio::test]
    async fn map_transforms_values() {
        let (publisher, subscription) = channel();
        let mut doubled = subscription.map(|value: i32| value * 2);

        publisher.publish(21);

        assert_eq!(doubled.next().await, Some(42));
    }
}
