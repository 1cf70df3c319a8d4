//! Callback bridge back to the host
//!
//! Delivery is one-way and at-most-once: the orchestrator hands over a
//! serialized payload and moves on. Nothing is acknowledged.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

pub trait CallbackBridge: Send + Sync {
    fn deliver(&self, payload: String);
}

/// Bridge backed by an unbounded channel; the host drains the receiver
#[derive(Clone)]
pub struct ChannelBridge {
    tx: UnboundedSender<String>,
}

impl ChannelBridge {
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl CallbackBridge for ChannelBridge {
    fn deliver(&self, payload: String) {
        if self.tx.send(payload).is_err() {
            warn!("Callback receiver closed, dropping result payload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_bridge_delivers_in_order() {
        let (bridge, mut rx) = ChannelBridge::new();
        bridge.deliver("one".to_string());
        bridge.deliver("two".to_string());
        drop(bridge);

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_closed_receiver_does_not_panic() {
        let (bridge, rx) = ChannelBridge::new();
        drop(rx);
        bridge.deliver("lost".to_string());
    }
}
