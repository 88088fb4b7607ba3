//! Core domain types shared by every Azrael component: object state, ids,
//! the object store, command queues, and the sparse force grid.

pub mod error;
pub mod force_grid;
pub mod ids;
pub mod queues;
pub mod state;
pub mod store;
pub mod vector;

pub use error::CoreError;
pub use force_grid::ForceGrid;
pub use ids::{ObjectId, PackageId, Token};
pub use queues::{
    CommandQueues, DrainedTick, ForceTorqueCommand, ModifyCommand, RemoveCommand, SpawnCommand,
};
pub use state::{Field, ObjectState, StateOverride, WIRE_FLOAT_COUNT};
pub use store::ObjectStore;
pub use vector::{Quat, Vec3, CLOSE_EPSILON};
