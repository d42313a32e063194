//! Sencast - Satellite hindcasting for inland and coastal water quality
//!
//! This library discovers Sentinel-3, Sentinel-2 and Landsat Level-1 scenes
//! for an area of interest, downloads what is missing, and drives each
//! sensing date through a chain of processors, a mosaic step and a chain of
//! adapters, with bounded concurrency and per-cell fault isolation.
//!
//! # High-Level API
//!
//! The [`service`] module provides the facade used by the CLI:
//!
//! ```ignore
//! use sencast::config::HindcastConfig;
//! use sencast::service::HindcastService;
//!
//! let config = HindcastConfig::load_from(path)?;
//! let service = HindcastService::builder(config).build()?;
//! let report = service.run().await?;
//! println!("{}", report);
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod adapter;
pub mod aoi;
pub mod availability;
pub mod catalog;
pub mod command;
pub mod config;
pub mod executor;
pub mod logging;
pub mod mosaic;
pub mod pipeline;
pub mod processor;
pub mod provider;
pub mod scene;
pub mod scheduler;
pub mod service;

/// Version of the Sencast library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boxed future used by the object-safe collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
