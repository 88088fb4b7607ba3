//! The object-state store (C1, §4.1).
//!
//! Only the coordinator mutates the store; concurrent client requests are
//! conceptually serialised by the coordinator's tick drain (§4.1), so no
//! internal locking is needed here — callers that expose this type across
//! threads are responsible for their own synchronisation (the coordinator
//! owns a single `ObjectStore` and never shares mutable access to it).

use std::collections::HashMap;

use crate::error::CoreError;
use crate::ids::ObjectId;
use crate::state::{ObjectState, StateOverride};

/// Durable map from object id to kinematic state + bounding radius.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, ObjectState>,
}

impl ObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new object. Re-spawning with an identical state is a no-op
    /// success; spawning over an existing object with a *different* state
    /// fails with [`CoreError::Duplicate`] (§4.1, S5).
    pub fn insert(&mut self, id: ObjectId, state: ObjectState) -> Result<(), CoreError> {
        match self.objects.get(&id) {
            None => {
                self.objects.insert(id, state);
                Ok(())
            }
            Some(existing) if existing.kinematically_close(&state) => Ok(()),
            Some(_) => Err(CoreError::Duplicate(format!(
                "object {id} already exists with a different state"
            ))),
        }
    }

    /// Replaces an existing object's full state.
    pub fn update(&mut self, id: ObjectId, state: ObjectState) -> Result<(), CoreError> {
        match self.objects.get_mut(&id) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("object {id}"))),
        }
    }

    /// Applies a partial override onto an existing object, bumping
    /// `last_changed` only when geometry/shape fields are touched (§3).
    pub fn apply_override(
        &mut self,
        id: ObjectId,
        partial: &StateOverride,
    ) -> Result<(), CoreError> {
        match self.objects.get_mut(&id) {
            Some(slot) => {
                let bump = partial.touches_geometry();
                let mut next = partial.apply(*slot);
                if bump {
                    next.last_changed = slot.last_changed + 1;
                }
                *slot = next;
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("object {id}"))),
        }
    }

    /// Removes an object.
    pub fn delete(&mut self, id: ObjectId) -> Result<(), CoreError> {
        match self.objects.remove(&id) {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound(format!("object {id}"))),
        }
    }

    /// Returns true if the given id is present.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Looks up a set of ids. Absence is reported per-id; the call itself
    /// never fails for missing ids (§4.1).
    pub fn get(&self, ids: &[ObjectId]) -> HashMap<ObjectId, Option<ObjectState>> {
        ids.iter()
            .map(|id| (*id, self.objects.get(id).copied()))
            .collect()
    }

    /// Returns all object ids currently in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// Returns all object states currently in the store.
    pub fn all_states(&self) -> HashMap<ObjectId, ObjectState> {
        self.objects.clone()
    }

    /// Returns the number of objects currently in the store.
    pub fn count(&self) -> usize {
        self.objects.len()
    }

    /// Returns each id's bounding radius, or `None` if the id is absent.
    pub fn get_aabb(&self, ids: &[ObjectId]) -> Vec<Option<f64>> {
        ids.iter()
            .map(|id| self.objects.get(id).map(|s| s.radius))
            .collect()
    }
}
