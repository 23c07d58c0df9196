//! Ordered, duplicate-free member lists
//!
//! This module provides the `RenderOrder` data structure used for the
//! surfaces of a layer and the layers of a screen. Members are ordered from
//! bottom to top: the first id is painted first, the last id ends up on top.
//! List position, not the numeric id, decides the paint order.

use std::collections::HashMap;

/// Bottom-to-top list of scene object ids with no duplicates.
///
/// # Examples
///
/// ```
/// use ivi_controller::scene::render_order::RenderOrder;
///
/// let order = RenderOrder::from_ids([5, 2, 2, 9]);
/// assert_eq!(order.ids(), &[5, 2, 9]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderOrder {
    /// Members ordered from bottom to top
    ids: Vec<u32>,

    /// Fast lookup: id → position in the list
    positions: HashMap<u32, usize>,
}

impl RenderOrder {
    /// Creates an empty render order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a render order from a sequence of ids.
    ///
    /// Repeated ids keep their first position; later repetitions are dropped.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut order = Self::new();
        for id in ids {
            order.push(id);
        }
        order
    }

    /// Adds an id on top.
    ///
    /// # Returns
    ///
    /// `true` if the id was added, `false` if it was already present
    pub fn push(&mut self, id: u32) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }

        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
        true
    }

    /// Removes an id.
    ///
    /// # Returns
    ///
    /// `Some(position)` with the id's previous position if found, `None` otherwise
    pub fn remove(&mut self, id: u32) -> Option<usize> {
        let pos = self.positions.remove(&id)?;
        self.ids.remove(pos);
        self.rebuild_positions();
        Some(pos)
    }

    /// Ids in bottom-to-top order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.positions.contains_key(&id)
    }

    /// Position 0 is the bottom-most member.
    pub fn position(&self, id: u32) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Members of `self` that are missing from `other`, in `self`'s order.
    pub fn missing_from<'a>(&'a self, other: &'a RenderOrder) -> impl Iterator<Item = u32> + 'a {
        self.iter().filter(move |id| !other.contains(*id))
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.positions.clear();
    }

    fn rebuild_positions(&mut self) {
        self.positions.clear();
        for (i, &id) in self.ids.iter().enumerate() {
            self.positions.insert(id, i);
        }
    }
}

impl PartialEq for RenderOrder {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Eq for RenderOrder {}
