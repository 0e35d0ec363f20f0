//! Per-frame change listeners.

use nohash_hasher::IntMap;
use tf_types::FrameId;

use crate::frame_store::FrameIdx;

/// Handle to a change subscription, returned by
/// [`crate::TransformGraph::on_change`] and consumed by
/// [`crate::TransformGraph::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked with the id of a frame whose world transform went stale.
pub type ChangeCallback = Box<dyn FnMut(&FrameId)>;

struct Subscription {
    token: SubscriptionId,
    callback: ChangeCallback,
}

/// Listener registry: callbacks per frame, fired in registration order.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    subscriptions_per_frame: IntMap<FrameIdx, Vec<Subscription>>,
    next_token: u64,
}

impl ChangeNotifier {
    pub fn subscribe(&mut self, frame: FrameIdx, callback: ChangeCallback) -> SubscriptionId {
        let token = SubscriptionId(self.next_token);
        self.next_token += 1;
        self.subscriptions_per_frame
            .entry(frame)
            .or_default()
            .push(Subscription { token, callback });
        token
    }

    /// Removes the subscription behind `token`. A no-op if it is gone already.
    pub fn unsubscribe(&mut self, token: SubscriptionId) {
        for subscriptions in self.subscriptions_per_frame.values_mut() {
            subscriptions.retain(|subscription| subscription.token != token);
        }
    }

    /// Drops every subscription registered for `frame`.
    pub fn remove_frame(&mut self, frame: FrameIdx) {
        self.subscriptions_per_frame.remove(&frame);
    }

    /// Invokes all callbacks registered for `frame`, in registration order.
    pub fn fire(&mut self, frame: FrameIdx, id: &FrameId) {
        if let Some(subscriptions) = self.subscriptions_per_frame.get_mut(&frame) {
            for subscription in subscriptions {
                (subscription.callback)(id);
            }
        }
    }
}
