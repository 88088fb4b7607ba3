//! Work-package registry (C5) and dispatch transport (C8): the boundary
//! between the coordinator's tick loop and the physics worker pool.

pub mod error;
pub mod registry;
pub mod transport;

pub use error::DispatchError;
pub use registry::{Package, PackageId, PackageRegistry, PayloadEntry};
pub use transport::DispatchQueue;
