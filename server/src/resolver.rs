//! World identifiers sent to clients.
//!
//! By default a world is identified by its UUID. Hosts may register an
//! override per world, for example to advertise a stable name that survives
//! world regeneration.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct World {
    pub id: Uuid,
    pub name: String,
}

impl World {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

pub type IdentifierFn = Arc<dyn Fn(&World) -> String + Send + Sync>;

#[derive(Default)]
pub struct WorldResolver {
    overrides: RwLock<HashMap<Uuid, IdentifierFn>>,
}

impl fmt::Debug for WorldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldResolver")
            .field("overrides", &self.overrides.read().len())
            .finish()
    }
}

impl WorldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier override for the world.
    pub fn register<F>(&self, world: Uuid, identifier: F)
    where
        F: Fn(&World) -> String + Send + Sync + 'static,
    {
        self.overrides.write().insert(world, Arc::new(identifier));
    }

    pub fn resolve(&self, world: &World) -> String {
        // Clone the override out so it runs without the lock held.
        let identifier = self.overrides.read().get(&world.id).cloned();
        match identifier {
            Some(identifier) => identifier(world),
            None => world.id.to_string(),
        }
    }
}
