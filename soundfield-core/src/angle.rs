//! The shared heading angle and its change notifications.
//!
//! [`AngleState`] holds one normalized angle in degrees, `[0, 360)`. Every
//! call to [`AngleState::set_angle`] stores the value and then invokes each
//! subscriber synchronously on the calling thread, in subscription order.
//! Writes come from the UI thread (touch) or from the sensor worker thread,
//! so subscribers must be `Send + Sync` and must not assume either.

use crate::math::FULL_TURN_DEGREES;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Callback invoked with the new angle after every write.
pub type AngleCallback = dyn Fn(f32) + Send + Sync;

/// Handle returned by [`AngleState::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct AngleState {
    bits: AtomicU32,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<AngleCallback>)>>,
    next_subscription_id: AtomicU64,
}

impl AngleState {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0.0f32.to_bits()),
            subscribers: Mutex::new(Vec::new()),
            next_subscription_id: AtomicU64::new(0),
        }
    }

    /// Current angle in degrees.
    pub fn angle(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Stores an already-wrapped angle and notifies every subscriber.
    ///
    /// Redundant writes of the same value still notify.
    pub fn set_angle(&self, value: f32) {
        debug_assert!(
            (0.0..FULL_TURN_DEGREES).contains(&value),
            "angle must be pre-wrapped into [0, 360), got {}",
            value
        );

        self.bits.store(value.to_bits(), Ordering::Release);

        // Snapshot so callbacks may subscribe/unsubscribe without deadlocking
        let subscribers: Vec<Arc<AngleCallback>> = self
            .lock_subscribers()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for callback in subscribers {
            callback(value);
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers().push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Arc<AngleCallback>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AngleState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AngleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AngleState")
            .field("angle", &self.angle())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_angle_notifies_every_write() {
        let state = AngleState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        state.subscribe(move |angle| seen_clone.lock().unwrap().push(angle));

        state.set_angle(10.0);
        state.set_angle(10.0);
        state.set_angle(350.0);

        assert_eq!(state.angle(), 350.0);
        assert_eq!(*seen.lock().unwrap(), vec![10.0, 10.0, 350.0]);
    }

    #[test]
    fn test_subscribers_run_in_order() {
        let state = AngleState::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        state.subscribe(move |_| first.lock().unwrap().push("redraw"));
        state.subscribe(move |_| second.lock().unwrap().push("rotation"));

        state.set_angle(45.0);
        assert_eq!(*order.lock().unwrap(), vec!["redraw", "rotation"]);
    }

    #[test]
    fn test_unsubscribe() {
        let state = AngleState::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let id = state.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        state.set_angle(1.0);
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.set_angle(2.0);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn test_notifies_from_other_thread() {
        let state = Arc::new(AngleState::new());
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        state.subscribe(move |angle| {
            *seen_clone.lock().unwrap() = Some((angle, std::thread::current().id()));
        });

        let writer = state.clone();
        let handle = std::thread::spawn(move || {
            writer.set_angle(123.0);
            std::thread::current().id()
        });
        let writer_thread = handle.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), Some((123.0, writer_thread)));
        assert_eq!(state.angle(), 123.0);
    }
}
