//! Client bindings to controller, surface, layer and screen objects
//!
//! Object ids live in a per-client namespace. Clients choose the ids of the
//! objects they create; objects the controller creates on its own (screen
//! objects announced on bind) are allocated from [`ObjectId::SERVER_BASE`]
//! upwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{ControllerError, Result};
use crate::protocol::ObjectType;

/// A connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A protocol object, scoped to its client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// First id of the range the controller allocates from
    pub const SERVER_BASE: u32 = 0xff00_0000;

    pub fn is_server_allocated(self) -> bool {
        self.0 >= Self::SERVER_BASE
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a binding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingTarget {
    Controller,
    Surface(u32),
    Layer(u32),
    Screen(u32),
}

impl BindingTarget {
    pub fn object_type(self) -> ObjectType {
        match self {
            BindingTarget::Controller => ObjectType::Controller,
            BindingTarget::Surface(_) => ObjectType::Surface,
            BindingTarget::Layer(_) => ObjectType::Layer,
            BindingTarget::Screen(_) => ObjectType::Screen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub target: BindingTarget,
    /// Set once the binding received `destroyed`; it gets no further events
    pub defunct: bool,
}

/// Address of a binding: the owning client and its object id
pub type BindingKey = (ClientId, ObjectId);

/// All live bindings, indexed by owner and by target.
///
/// Per-target lists keep bind order, which is the order events fan out in.
#[derive(Debug, Default)]
pub(crate) struct BindingTable {
    bindings: BTreeMap<BindingKey, Binding>,
    by_target: HashMap<BindingTarget, Vec<BindingKey>>,
}

impl BindingTable {
    pub fn insert(&mut self, key: BindingKey, target: BindingTarget) -> Result<()> {
        if self.bindings.contains_key(&key) {
            return Err(ControllerError::ObjectInUse(key.1));
        }
        self.bindings.insert(
            key,
            Binding {
                target,
                defunct: false,
            },
        );
        self.by_target.entry(target).or_default().push(key);
        Ok(())
    }

    pub fn get(&self, key: BindingKey) -> Option<&Binding> {
        self.bindings.get(&key)
    }

    pub fn remove(&mut self, key: BindingKey) -> Option<Binding> {
        let binding = self.bindings.remove(&key)?;
        if let Some(keys) = self.by_target.get_mut(&binding.target) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.by_target.remove(&binding.target);
            }
        }
        Some(binding)
    }

    /// Number of bindings to `target`, defunct ones included
    pub fn count(&self, target: BindingTarget) -> usize {
        self.by_target.get(&target).map_or(0, Vec::len)
    }

    /// Bindings to `target` that still receive events
    pub fn live(&self, target: BindingTarget) -> Vec<BindingKey> {
        self.by_target
            .get(&target)
            .into_iter()
            .flatten()
            .copied()
            .filter(|key| self.bindings.get(key).is_some_and(|b| !b.defunct))
            .collect()
    }

    /// Flags every live binding to `target` as defunct and returns them
    pub fn mark_defunct(&mut self, target: BindingTarget) -> Vec<BindingKey> {
        let keys = self.live(target);
        for key in &keys {
            if let Some(binding) = self.bindings.get_mut(key) {
                binding.defunct = true;
            }
        }
        keys
    }

    /// Removes every binding to `target`
    pub fn remove_target(&mut self, target: BindingTarget) -> Vec<(BindingKey, Binding)> {
        let keys = self.by_target.remove(&target).unwrap_or_default();
        keys.into_iter()
            .filter_map(|key| self.bindings.remove(&key).map(|b| (key, b)))
            .collect()
    }

    /// Object ids owned by `client`, in id order
    pub fn of_client(&self, client: ClientId) -> Vec<ObjectId> {
        self.bindings
            .range((client, ObjectId(0))..=(client, ObjectId(u32::MAX)))
            .map(|((_, object), _)| *object)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}
