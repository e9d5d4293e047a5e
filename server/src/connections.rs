//! Connection tracking for the UDP reference host
//!
//! This module maps transport addresses to client identities:
//! - Connection lifecycle (connect, disconnect, idle timeout)
//! - Capacity limits
//! - The world each connection currently plays in
//!
//! Capability state is not kept here; that belongs to the bridge registry.

use crate::registry::ClientId;
use crate::resolver::World;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A connected transport endpoint
#[derive(Debug)]
pub struct Connection {
    /// Identity handed to the bridge
    pub id: ClientId,
    /// Network address for sending frames
    pub addr: SocketAddr,
    /// Last time we received any frame from this client
    pub last_seen: Instant,
    pub client_version: u32,
    pub world: World,
}

impl Connection {
    pub fn new(id: ClientId, addr: SocketAddr, client_version: u32, world: World) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            client_version,
            world,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing was received within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All live connections, indexed by client identity
pub struct ConnectionTable {
    connections: HashMap<ClientId, Connection>,
    max_clients: usize,
}

impl ConnectionTable {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a new connection in `world`.
    ///
    /// Returns None if the host is at capacity.
    pub fn add_connection(
        &mut self,
        addr: SocketAddr,
        client_version: u32,
        world: World,
    ) -> Option<ClientId> {
        if self.connections.len() >= self.max_clients {
            return None;
        }

        let id = Uuid::new_v4();
        info!("Client {} connected from {} (version {})", id, addr, client_version);
        self.connections
            .insert(id, Connection::new(id, addr, client_version, world));

        Some(id)
    }

    /// Returns true if the connection existed
    pub fn remove_connection(&mut self, id: &ClientId) -> bool {
        if let Some(connection) = self.connections.remove(id) {
            info!("Client {} disconnected from {}", connection.id, connection.addr);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<ClientId> {
        self.connections
            .values()
            .find(|connection| connection.addr == addr)
            .map(|connection| connection.id)
    }

    /// Refreshes the activity timestamp of whoever sent from `addr`
    pub fn touch(&mut self, addr: SocketAddr) -> Option<ClientId> {
        let connection = self
            .connections
            .values_mut()
            .find(|connection| connection.addr == addr)?;
        connection.touch();
        Some(connection.id)
    }

    pub fn addr_of(&self, id: &ClientId) -> Option<SocketAddr> {
        self.connections.get(id).map(|connection| connection.addr)
    }

    pub fn world_of(&self, id: &ClientId) -> Option<&World> {
        self.connections.get(id).map(|connection| &connection.world)
    }

    /// Moves a connection to another world; returns false for unknown ids
    pub fn set_world(&mut self, id: &ClientId, world: World) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) => {
                connection.world = world;
                true
            }
            None => false,
        }
    }

    /// Removes and returns connections idle for longer than `timeout`
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<ClientId> {
        let timed_out: Vec<ClientId> = self
            .connections
            .values()
            .filter(|connection| connection.is_timed_out(timeout))
            .map(|connection| connection.id)
            .collect();

        for id in &timed_out {
            self.remove_connection(id);
        }

        timed_out
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.connections.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_connection_timeout() {
        let mut connection = Connection::new(Uuid::new_v4(), test_addr(), 1, World::new("w"));
        assert!(!connection.is_timed_out(Duration::from_secs(1)));

        connection.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(connection.is_timed_out(Duration::from_secs(1)));

        connection.touch();
        assert!(!connection.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_connection() {
        let mut table = ConnectionTable::new(2);
        let id = table
            .add_connection(test_addr(), 1, World::new("world"))
            .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.addr_of(&id), Some(test_addr()));
        assert_eq!(table.find_by_addr(test_addr()), Some(id));
        assert_eq!(table.world_of(&id).map(|w| w.name.as_str()), Some("world"));
    }

    #[test]
    fn test_add_connection_max_capacity() {
        let mut table = ConnectionTable::new(1);
        assert!(table.add_connection(test_addr(), 1, World::new("w")).is_some());
        assert!(table.add_connection(test_addr2(), 1, World::new("w")).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_connection() {
        let mut table = ConnectionTable::new(2);
        let id = table.add_connection(test_addr(), 1, World::new("w")).unwrap();

        assert!(table.remove_connection(&id));
        assert!(!table.remove_connection(&id));
        assert!(table.is_empty());
        assert_eq!(table.find_by_addr(test_addr()), None);
    }

    #[test]
    fn test_touch_and_find() {
        let mut table = ConnectionTable::new(2);
        let id = table.add_connection(test_addr(), 1, World::new("w")).unwrap();

        assert_eq!(table.touch(test_addr()), Some(id));
        assert_eq!(table.touch(test_addr2()), None);
    }

    #[test]
    fn test_set_world() {
        let mut table = ConnectionTable::new(2);
        let id = table.add_connection(test_addr(), 1, World::new("world")).unwrap();
        let nether = World::new("world_nether");

        assert!(table.set_world(&id, nether.clone()));
        assert_eq!(table.world_of(&id), Some(&nether));
        assert!(!table.set_world(&Uuid::new_v4(), nether));
    }

    #[test]
    fn test_check_timeouts_removes_idle() {
        let mut table = ConnectionTable::new(3);
        let idle = table.add_connection(test_addr(), 1, World::new("w")).unwrap();
        let active = table.add_connection(test_addr2(), 1, World::new("w")).unwrap();

        table.connections.get_mut(&idle).unwrap().last_seen =
            Instant::now() - Duration::from_secs(10);

        assert_eq!(table.check_timeouts(Duration::from_secs(5)), vec![idle]);
        assert_eq!(table.client_ids(), vec![active]);
    }
}
