//! Pipeline stages of one group.
//!
//! Each stage is responsible for a single step of a group's run:
//!
//! 1. **Download** - Fetch missing Level-1 products under download permits
//! 2. **Integrity** - Confirm every Level-1 path exists
//! 3. **Reduce** - Drop tiles not needed to cover the AOI corners
//! 4. **Process** - Run the processor chain per tile
//! 5. **Mosaic** - Merge per-tile outputs per processor
//! 6. **Adapt** - Run the adapter chain on the merged products

mod adapt;
mod download;
mod integrity;
mod mosaic;
mod process;
mod reduce;

#[cfg(test)]
mod testing;

pub use adapt::adapt_stage;
pub use download::download_stage;
pub use integrity::integrity_stage;
pub use mosaic::mosaic_stage;
pub use process::process_stage;
pub use reduce::{minimal_cover, reduce_stage, Reduction, REDUCIBLE_GROUP_SIZES};
