//! High-level service facade for hindcast runs.
//!
//! This module encapsulates all component wiring, following the Facade
//! pattern: the CLI hands over a [`HindcastConfig`](crate::config::HindcastConfig)
//! and gets back a [`RunReport`](crate::pipeline::RunReport).
//!
//! # Example
//!
//! ```ignore
//! use sencast::config::HindcastConfig;
//! use sencast::service::HindcastService;
//!
//! let config = HindcastConfig::load()?;
//! let service = HindcastService::builder(config).build()?;
//!
//! let search = service.search().await?;
//! println!("{} scenes, {} to download", search.found, search.availability.to_download);
//!
//! let report = service.run().await?;
//! ```

mod builder;
mod error;
mod facade;

pub use builder::HindcastServiceBuilder;
pub use error::ServiceError;
pub use facade::{HindcastService, SceneSearch};
