//! Scene identity.
//!
//! - [`SceneDescriptor`]: what a provider search returns for one acquisition
//! - [`ProductName`]: sensing window, tier and tile parsed from a product name
//! - [`scene_path`] / [`OutputLayout`]: deterministic local paths

mod name;
mod path;
mod types;

pub use name::{ProductName, ProductNameError};
pub use path::{scene_path, OutputLayout};
pub use types::{ResolvedScene, SceneDescriptor, ScenePair, Sensor, Timeliness};
