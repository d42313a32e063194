//! Bounded concurrent execution of scene groups.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ConcurrencyCoordinator                      │
//! │  spawn one worker per group (scheduling order), join all    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Download    │  │ Process     │  │ Adapt               │  │
//! │  │ pool        │  │ pool        │  │ pool                │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Download**: held for one transfer attempt of one scene, so downloads
//!   of different groups interleave.
//! - **Process**: held by a group for its whole processor chain and mosaic.
//! - **Adapt**: held by a group for its whole adapter chain.

mod coordinator;
mod resource_pool;

pub use coordinator::{ConcurrencyCoordinator, GroupWorker};
pub use resource_pool::{
    PoolCapacities, ResourcePermit, ResourcePool, ResourcePools, ResourceType,
};
