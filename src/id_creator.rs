//! Unique ID minting for items, tracks and entity groups.

use crate::errors::UncError;

/// ID namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Item,
    Track,
    EntityGroup,
}

/// Monotonic ID allocator.
///
/// In the default mode each namespace has its own counter starting at 1.
/// In unified mode all namespaces draw from one shared counter, so IDs
/// are unique across namespaces. A counter that has wrapped to 0 makes
/// further allocations fail.
#[derive(Debug, Clone)]
pub struct IdCreator {
    unified: bool,
    next_id_item: u32,
    next_id_track: u32,
    next_id_entity_group: u32,
    next_id_global: u32,
}

impl Default for IdCreator {
    fn default() -> Self {
        Self {
            unified: false,
            next_id_item: 1,
            next_id_track: 1,
            next_id_entity_group: 1,
            next_id_global: 1,
        }
    }
}

impl IdCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unified(&mut self, unified: bool) {
        self.unified = unified;
    }

    pub fn unified(&self) -> bool {
        self.unified
    }

    /// Returns a new unique ID for the given namespace.
    pub fn new_id(&mut self, ns: Namespace) -> Result<u32, UncError> {
        let counter = if self.unified {
            &mut self.next_id_global
        } else {
            match ns {
                Namespace::Item => &mut self.next_id_item,
                Namespace::Track => &mut self.next_id_track,
                Namespace::EntityGroup => &mut self.next_id_entity_group,
            }
        };

        if *counter == 0 {
            return Err(UncError::Usage("ID namespace overflow".into()));
        }

        let id = *counter;
        *counter = counter.wrapping_add(1);
        Ok(id)
    }
}
