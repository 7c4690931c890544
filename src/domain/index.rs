use super::entity::{Container, Image, Indexed, short_id};
use super::errors::CleanupError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, Write};

/// Dual-keyed lookup table: short identifier → entity, secondary key → entity.
///
/// Secondary keys resolve through the short identifier, so an entity is stored
/// once. When two entities claim the same key the last one added wins.
#[derive(Debug, Clone)]
pub struct EntityIndex<T> {
    by_id: HashMap<String, T>,
    by_key: HashMap<String, String>,
}

pub type ImageIndex = EntityIndex<Image>;
pub type ContainerIndex = EntityIndex<Container>;

impl<T> Default for EntityIndex<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_key: HashMap::new(),
        }
    }
}

impl<T: Indexed> EntityIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the entity under its short identifier and every secondary key.
    ///
    /// Fails with [`CleanupError::InvalidIdentifier`] without touching the
    /// index when the identifier has fewer than 12 characters.
    pub fn add(&mut self, entity: T) -> Result<(), CleanupError> {
        let id = short_id(entity.id())?.to_string();

        for key in entity.secondary_keys() {
            self.by_key.insert(key.to_string(), id.clone());
        }
        self.by_id.insert(id, entity);

        Ok(())
    }

    pub fn find_by_id(&self, short_id: &str) -> Option<&T> {
        self.by_id.get(short_id)
    }

    pub fn find_by_secondary_key(&self, key: &str) -> Option<&T> {
        self.by_key.get(key).and_then(|id| self.by_id.get(id))
    }

    /// Entities by primary key, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_key.clear();
    }

    /// Prints every indexed entity to stdout.
    pub fn dump(&self) -> io::Result<()>
    where
        T: Debug,
    {
        self.dump_to(&mut io::stdout().lock())
    }

    pub fn dump_to(&self, out: &mut impl Write) -> io::Result<()>
    where
        T: Debug,
    {
        for (id, entity) in &self.by_id {
            writeln!(out, "{id} =>\n    {entity:?}")?;
        }
        Ok(())
    }
}
