//! Per-client capability tracking.
//!
//! Every connected client owns one [`ClientSlot`] behind its own mutex. The
//! registry map is only locked long enough to find, insert or remove a slot,
//! so traffic for one client never waits on another client's transition.
//!
//! A slot holds the capability state together with the client's deferred
//! queue. Because both live under the same lock, a state change and the
//! flush or discard it implies are observed as one step by every concurrent
//! delivery for that client.

use crate::queue::DeferredQueue;
use parking_lot::{Mutex, RwLock};
use shared::Packet;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Stable identity of one connected session.
pub type ClientId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Connected, grace window open, no self-report yet.
    Undetermined,
    /// Self-reported; packets go out immediately.
    Capable,
    /// Grace window expired or channel unregistered; packets are dropped.
    Incapable,
}

/// Result of a self-report against a slot.
#[derive(Debug, PartialEq)]
pub enum Promotion {
    /// The client became capable; these packets were waiting, oldest first.
    Promoted(Vec<Packet>),
    AlreadyCapable,
    /// Incapable clients stay incapable for the rest of the session.
    Rejected,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Demotion {
    Demoted { discarded: usize },
    AlreadyIncapable,
}

/// What the slot decided to do with an outbound packet.
#[derive(Debug, PartialEq)]
pub enum Admission {
    Transmit(Packet),
    Queued,
    Dropped(Packet),
}

#[derive(Debug)]
pub struct ClientSlot {
    session: u64,
    state: Capability,
    pending: Option<DeferredQueue>,
    detection: Option<JoinHandle<()>>,
    released: bool,
}

impl ClientSlot {
    fn new(session: u64) -> Self {
        Self {
            session,
            state: Capability::Undetermined,
            pending: None,
            detection: None,
            released: false,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn state(&self) -> Capability {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, DeferredQueue::len)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn promote(&mut self) -> Promotion {
        match self.state {
            Capability::Capable => Promotion::AlreadyCapable,
            Capability::Incapable => Promotion::Rejected,
            Capability::Undetermined => {
                self.state = Capability::Capable;
                if let Some(timer) = self.detection.take() {
                    timer.abort();
                }
                let flushed = self
                    .pending
                    .take()
                    .map(|mut queue| queue.flush())
                    .unwrap_or_default();
                Promotion::Promoted(flushed)
            }
        }
    }

    pub fn demote(&mut self) -> Demotion {
        if self.state == Capability::Incapable {
            return Demotion::AlreadyIncapable;
        }
        self.state = Capability::Incapable;
        let discarded = self.pending.take().map_or(0, |mut queue| queue.discard());
        Demotion::Demoted { discarded }
    }

    /// Decides the fate of an outbound packet. Undetermined clients get the
    /// packet appended to a lazily created queue.
    pub fn admit(&mut self, packet: Packet) -> Admission {
        match self.state {
            Capability::Capable => Admission::Transmit(packet),
            Capability::Undetermined => {
                self.pending
                    .get_or_insert_with(DeferredQueue::new)
                    .enqueue(packet);
                Admission::Queued
            }
            Capability::Incapable => Admission::Dropped(packet),
        }
    }

    pub fn set_detection(&mut self, timer: JoinHandle<()>) {
        if let Some(previous) = self.detection.replace(timer) {
            previous.abort();
        }
    }

    /// Ends the session: cancels the detection timer and throws away
    /// anything still queued.
    fn release(&mut self) -> usize {
        self.released = true;
        if let Some(timer) = self.detection.take() {
            timer.abort();
        }
        self.pending.take().map_or(0, |mut queue| queue.discard())
    }
}

#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    slots: RwLock<HashMap<ClientId, Arc<Mutex<ClientSlot>>>>,
    next_session: AtomicU64,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a client as undetermined and returns the session
    /// number that detection timers must present later. A session already
    /// open for the same id is released first.
    pub fn open(&self, client: ClientId) -> u64 {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = Arc::new(Mutex::new(ClientSlot::new(session)));
        let previous = self.slots.write().insert(client, slot);
        if let Some(previous) = previous {
            previous.lock().release();
        }
        session
    }

    /// Stops tracking a client. Returns the number of discarded packets, or
    /// `None` if the client was not tracked.
    pub fn close(&self, client: &ClientId) -> Option<usize> {
        let slot = self.slots.write().remove(client)?;
        let discarded = slot.lock().release();
        Some(discarded)
    }

    /// Runs `f` with the client's slot locked. Returns `None` for untracked
    /// clients, including one whose session was closed while we waited for
    /// the lock.
    pub fn with_slot<R>(&self, client: &ClientId, f: impl FnOnce(&mut ClientSlot) -> R) -> Option<R> {
        let slot = self.slots.read().get(client).cloned()?;
        let mut guard = slot.lock();
        if guard.released {
            return None;
        }
        Some(f(&mut guard))
    }

    /// Like [`with_slot`](Self::with_slot), but only if the slot still
    /// belongs to `session`.
    pub fn with_session<R>(
        &self,
        client: &ClientId,
        session: u64,
        f: impl FnOnce(&mut ClientSlot) -> R,
    ) -> Option<R> {
        self.with_slot(client, |slot| (slot.session() == session).then(|| f(slot)))
            .flatten()
    }

    /// Capability of a client; untracked clients report `Incapable`.
    pub fn query(&self, client: &ClientId) -> Capability {
        self.lookup(client).unwrap_or(Capability::Incapable)
    }

    /// Capability of a client, or `None` once it is no longer tracked.
    pub fn lookup(&self, client: &ClientId) -> Option<Capability> {
        self.with_slot(client, |slot| slot.state)
    }

    pub fn is_tracked(&self, client: &ClientId) -> bool {
        self.lookup(client).is_some()
    }

    pub fn pending_len(&self, client: &ClientId) -> usize {
        self.with_slot(client, |slot| slot.pending_len()).unwrap_or(0)
    }

    /// Snapshot of the clients currently in `state`.
    pub fn clients_in(&self, state: Capability) -> Vec<ClientId> {
        let slots: Vec<(ClientId, Arc<Mutex<ClientSlot>>)> = self
            .slots
            .read()
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        slots
            .into_iter()
            .filter(|(_, slot)| {
                let slot = slot.lock();
                !slot.released && slot.state == state
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hologram(n: u128) -> Packet {
        Packet::HologramRemove {
            id: Uuid::from_u128(n),
        }
    }

    #[test]
    fn test_open_starts_undetermined() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();

        registry.open(client);
        assert_eq!(registry.lookup(&client), Some(Capability::Undetermined));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_untracked_client_reports_incapable() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();

        assert_eq!(registry.lookup(&client), None);
        assert_eq!(registry.query(&client), Capability::Incapable);
        assert!(registry.with_slot(&client, |_| ()).is_none());
    }

    #[test]
    fn test_admit_queues_while_undetermined() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);

        let admitted = registry.with_slot(&client, |slot| {
            assert!(!slot.has_pending());
            slot.admit(hologram(1))
        });
        assert_eq!(admitted, Some(Admission::Queued));
        assert_eq!(registry.pending_len(&client), 1);
    }

    #[test]
    fn test_promote_flushes_in_order_once() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);

        registry.with_slot(&client, |slot| {
            slot.admit(hologram(1));
            slot.admit(hologram(2));
            slot.admit(hologram(3));
        });

        let first = registry.with_slot(&client, |slot| slot.promote()).unwrap();
        assert_eq!(
            first,
            Promotion::Promoted(vec![hologram(1), hologram(2), hologram(3)])
        );

        let second = registry.with_slot(&client, |slot| slot.promote()).unwrap();
        assert_eq!(second, Promotion::AlreadyCapable);

        registry.with_slot(&client, |slot| {
            assert!(!slot.has_pending());
            assert_eq!(slot.admit(hologram(4)), Admission::Transmit(hologram(4)));
            assert!(!slot.has_pending());
        });
    }

    #[test]
    fn test_demote_discards_queue() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);

        let demotion = registry
            .with_slot(&client, |slot| {
                slot.admit(hologram(1));
                slot.admit(hologram(2));
                slot.demote()
            })
            .unwrap();

        assert_eq!(demotion, Demotion::Demoted { discarded: 2 });
        assert_eq!(registry.pending_len(&client), 0);
        assert_eq!(registry.query(&client), Capability::Incapable);

        let again = registry.with_slot(&client, |slot| slot.demote()).unwrap();
        assert_eq!(again, Demotion::AlreadyIncapable);
    }

    #[test]
    fn test_incapable_drops_without_queue() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);

        registry.with_slot(&client, |slot| {
            slot.demote();
            assert_eq!(slot.admit(hologram(1)), Admission::Dropped(hologram(1)));
            assert!(!slot.has_pending());
        });
    }

    #[test]
    fn test_incapable_cannot_be_promoted() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);

        registry.with_slot(&client, |slot| slot.demote());
        let promotion = registry.with_slot(&client, |slot| slot.promote()).unwrap();

        assert_eq!(promotion, Promotion::Rejected);
        assert_eq!(registry.query(&client), Capability::Incapable);
    }

    #[test]
    fn test_capable_can_be_demoted() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);

        registry.with_slot(&client, |slot| slot.promote());
        let demotion = registry.with_slot(&client, |slot| slot.demote()).unwrap();

        assert_eq!(demotion, Demotion::Demoted { discarded: 0 });
        assert_eq!(registry.clients_in(Capability::Capable), Vec::<ClientId>::new());
        assert_eq!(registry.clients_in(Capability::Incapable), vec![client]);
    }

    #[test]
    fn test_close_forgets_everything() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();
        registry.open(client);
        registry.with_slot(&client, |slot| slot.admit(hologram(1)));

        assert_eq!(registry.close(&client), Some(1));
        assert!(!registry.is_tracked(&client));
        assert!(registry.is_empty());
        assert_eq!(registry.close(&client), None);
    }

    #[test]
    fn test_with_session_ignores_stale_session() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();

        let old = registry.open(client);
        let new = registry.open(client);
        assert_ne!(old, new);

        assert!(registry
            .with_session(&client, old, |slot| slot.demote())
            .is_none());
        assert_eq!(registry.query(&client), Capability::Undetermined);

        assert!(registry
            .with_session(&client, new, |slot| slot.demote())
            .is_some());
        assert_eq!(registry.query(&client), Capability::Incapable);
    }

    #[test]
    fn test_slot_reports_its_session() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();

        let first = registry.open(client);
        assert_eq!(registry.with_slot(&client, |slot| slot.session()), Some(first));

        let second = registry.open(client);
        assert_eq!(registry.with_slot(&client, |slot| slot.session()), Some(second));
        assert!(registry.close(&client).is_some());
        assert_eq!(registry.with_slot(&client, |slot| slot.session()), None);
    }

    #[test]
    fn test_reopen_resets_state() {
        let registry = CapabilityRegistry::new();
        let client = Uuid::new_v4();

        registry.open(client);
        registry.with_slot(&client, |slot| slot.demote());
        registry.open(client);

        assert_eq!(registry.query(&client), Capability::Undetermined);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clients_in_partitions_states() {
        let registry = CapabilityRegistry::new();
        let capable = Uuid::new_v4();
        let incapable = Uuid::new_v4();
        let waiting = Uuid::new_v4();

        for client in [capable, incapable, waiting] {
            registry.open(client);
        }
        registry.with_slot(&capable, |slot| slot.promote());
        registry.with_slot(&incapable, |slot| slot.demote());

        assert_eq!(registry.clients_in(Capability::Capable), vec![capable]);
        assert_eq!(registry.clients_in(Capability::Incapable), vec![incapable]);
        assert_eq!(registry.clients_in(Capability::Undetermined), vec![waiting]);
    }
}
