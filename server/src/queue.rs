//! Per-client buffer of packets held back while a client is undetermined.
//!
//! The buffer does not look at capability itself. It is owned by the
//! client's registry slot and only touched under that slot's lock, which is
//! what keeps enqueue, flush and discard atomic with the state transitions
//! that trigger them.

use shared::Packet;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct DeferredQueue {
    packets: VecDeque<Packet>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a packet behind everything already waiting. Nothing is
    /// merged or de-duplicated, even two updates of the same attribute.
    pub fn enqueue(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    /// Takes every waiting packet in the order it was enqueued.
    pub fn flush(&mut self) -> Vec<Packet> {
        self.packets.drain(..).collect()
    }

    /// Drops every waiting packet, returning how many were thrown away.
    pub fn discard(&mut self) -> usize {
        let count = self.packets.len();
        self.packets.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(name: &str) -> Packet {
        Packet::UpdateWorld {
            world: name.to_string(),
        }
    }

    #[test]
    fn test_new_queue_is_empty() {
        let queue = DeferredQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_flush_preserves_enqueue_order() {
        let mut queue = DeferredQueue::new();
        queue.enqueue(world("m1"));
        queue.enqueue(world("m2"));
        queue.enqueue(world("m3"));

        assert_eq!(queue.flush(), vec![world("m1"), world("m2"), world("m3")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut queue = DeferredQueue::new();
        queue.enqueue(world("same"));
        queue.enqueue(world("same"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.flush().len(), 2);
    }

    #[test]
    fn test_discard_returns_count() {
        let mut queue = DeferredQueue::new();
        queue.enqueue(world("a"));
        queue.enqueue(world("b"));

        assert_eq!(queue.discard(), 2);
        assert!(queue.is_empty());
        assert!(queue.flush().is_empty());
    }
}
