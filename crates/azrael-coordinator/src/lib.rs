//! The physics coordinator ("Leonard", C6, §4.6): drains client commands,
//! builds collision islands, dispatches work packages to the worker pool,
//! and reconciles results back into the object store once per tick.

pub mod coordinator;
pub mod driver;
pub mod supervisor;

pub use coordinator::{Coordinator, CoordinatorConfig, TickReport};
pub use driver::TickDriver;
pub use supervisor::WorkerSupervisor;
