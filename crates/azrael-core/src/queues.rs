//! The four command queues (C2, §4.2) clients append to and the coordinator
//! drains once per tick.

use std::collections::HashMap;

use crate::ids::ObjectId;
use crate::state::{ObjectState, StateOverride};
use crate::vector::Vec3;

/// A spawn request: create `object_id` with `initial_state` and bounding
/// `aabb_radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnCommand {
    pub object_id: ObjectId,
    pub initial_state: ObjectState,
    pub aabb_radius: f64,
}

/// A partial-state update request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModifyCommand {
    pub object_id: ObjectId,
    pub state_override: StateOverride,
}

/// A removal request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RemoveCommand {
    pub object_id: ObjectId,
}

/// A central-force-and-torque request for the current tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceTorqueCommand {
    pub object_id: ObjectId,
    pub central_force: Vec3,
    pub torque: Vec3,
}

/// Coalescing policy for a queue: whether a repeat append for the same
/// object-id keeps the first command or replaces it with the latest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CoalescePolicy {
    FirstWins,
    LatestWins,
}

/// A single command queue holding at most one outstanding command per
/// object-id (§4.2).
#[derive(Debug)]
struct CommandQueue<T> {
    policy: CoalescePolicy,
    entries: HashMap<ObjectId, T>,
}

impl<T> CommandQueue<T> {
    fn new(policy: CoalescePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    /// Appends a command. Never blocks, never fails.
    fn append(&mut self, id: ObjectId, cmd: T) {
        match self.policy {
            CoalescePolicy::FirstWins => {
                self.entries.entry(id).or_insert(cmd);
            }
            CoalescePolicy::LatestWins => {
                self.entries.insert(id, cmd);
            }
        }
    }

    fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The four command queues, bundled so the coordinator can drain them in the
/// fixed §4.2 order: remove, spawn, modify, force/torque.
pub struct CommandQueues {
    spawn: CommandQueue<SpawnCommand>,
    modify: CommandQueue<ModifyCommand>,
    remove: CommandQueue<RemoveCommand>,
    force_torque: CommandQueue<ForceTorqueCommand>,
}

impl Default for CommandQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueues {
    pub fn new() -> Self {
        Self {
            spawn: CommandQueue::new(CoalescePolicy::FirstWins),
            modify: CommandQueue::new(CoalescePolicy::LatestWins),
            remove: CommandQueue::new(CoalescePolicy::FirstWins),
            force_torque: CommandQueue::new(CoalescePolicy::LatestWins),
        }
    }

    pub fn append_spawn(&mut self, cmd: SpawnCommand) {
        self.spawn.append(cmd.object_id, cmd);
    }

    pub fn append_modify(&mut self, cmd: ModifyCommand) {
        self.modify.append(cmd.object_id, cmd);
    }

    pub fn append_remove(&mut self, cmd: RemoveCommand) {
        self.remove.append(cmd.object_id, cmd);
    }

    pub fn append_force_torque(&mut self, cmd: ForceTorqueCommand) {
        self.force_torque.append(cmd.object_id, cmd);
    }

    pub fn pending_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.spawn.len(),
            self.modify.len(),
            self.remove.len(),
            self.force_torque.len(),
        )
    }

    /// Drains all four queues in the fixed §4.2 order (remove, spawn,
    /// modify, force/torque) and returns the drained commands grouped the
    /// same way. The coordinator applies each group to the object store
    /// before moving to the next.
    pub fn drain_tick(&mut self) -> DrainedTick {
        DrainedTick {
            removes: self.remove.drain(),
            spawns: self.spawn.drain(),
            modifies: self.modify.drain(),
            force_torques: self.force_torque.drain(),
        }
    }
}

/// One tick's worth of drained commands, in application order.
pub struct DrainedTick {
    pub removes: Vec<RemoveCommand>,
    pub spawns: Vec<SpawnCommand>,
    pub modifies: Vec<ModifyCommand>,
    pub force_torques: Vec<ForceTorqueCommand>,
}
