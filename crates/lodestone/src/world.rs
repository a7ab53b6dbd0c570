//! The world collaborator.
//!
//! Terrain, entities and chunk storage live outside this crate. The server
//! only needs to find a world by name, list worlds in order, and ask the
//! collaborator to reload its configuration.

use std::fmt;
use std::rc::Rc;

/// An opaque world handle.
pub trait World: fmt::Debug {
    fn name(&self) -> &str;
}

/// The world collaborator failed to reload.
#[derive(Debug, thiserror::Error)]
#[error("world reload failed: {0}")]
pub struct WorldReloadError(pub String);

/// Looks worlds up for the server.
///
/// [`worlds`](Self::worlds) is ordered; new players are placed in the
/// first world.
pub trait WorldLookup {
    fn world(&self, name: &str) -> Option<Rc<dyn World>>;

    fn worlds(&self) -> Vec<Rc<dyn World>>;

    /// Re-reads world configuration. Must not touch connected players.
    fn reload(&mut self) -> Result<(), WorldReloadError> {
        Ok(())
    }
}

/// A world that is nothing but a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedWorld(pub String);

impl World for NamedWorld {
    fn name(&self) -> &str {
        &self.0
    }
}

/// A fixed, ordered list of worlds.
#[derive(Debug, Default)]
pub struct StaticWorlds {
    worlds: Vec<Rc<dyn World>>,
}

impl StaticWorlds {
    /// One [`NamedWorld`] per name, in the order given.
    pub fn named<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            worlds: names
                .into_iter()
                .map(|name| Rc::new(NamedWorld(name.into())) as Rc<dyn World>)
                .collect(),
        }
    }

    pub fn push(&mut self, world: Rc<dyn World>) {
        self.worlds.push(world);
    }
}

impl WorldLookup for StaticWorlds {
    fn world(&self, name: &str) -> Option<Rc<dyn World>> {
        self.worlds
            .iter()
            .find(|w| w.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    fn worlds(&self) -> Vec<Rc<dyn World>> {
        self.worlds.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_worlds_preserve_order_and_match_case_insensitively() {
        let worlds = StaticWorlds::named(["world", "world_nether"]);

        let names: Vec<_> = worlds.worlds().iter().map(|w| w.name().to_string()).collect();
        assert_eq!(names, vec!["world", "world_nether"]);
        assert_eq!(worlds.world("WORLD_NETHER").unwrap().name(), "world_nether");
        assert!(worlds.world("world_the_end").is_none());
    }
}
