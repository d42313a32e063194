//! Hindcast configuration.
//!
//! One INI file describes a run: the AOI and time window, the processor and
//! adapter chains, pool capacities and the download provider.
//!
//! ```ini
//! [general]
//! name = geneva
//! wkt_file = geneva.wkt
//! sensor = OLCI
//! start = 2021-07-01
//! end = 2021-07-31
//! processors = IDEPIX, C2RCC
//! adapters = QLRGB, MANIFEST
//!
//! [concurrency]
//! max_parallel_downloads = 2
//! max_parallel_processors = 1
//!
//! [provider]
//! type = creodias
//! username = someone@example.org
//! password = secret
//!
//! [processor.C2RCC]
//! command = gpt c2rcc.xml -Ssource={input:IDEPIX} -t {output}
//! ```

mod defaults;
mod file;
mod parser;
mod settings;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigurationError};
pub use settings::{
    split_list, ConcurrencySettings, GeneralSettings, HindcastConfig, LoggingSettings,
    MosaicSettings, ProviderSettings, SectionParams,
};

use crate::aoi::Aoi;

impl HindcastConfig {
    /// Builds the area of interest named by `[general]`.
    pub fn aoi(&self) -> Result<Aoi, ConfigurationError> {
        Ok(Aoi::from_wkt(self.general.name.clone(), &self.general.wkt)?)
    }
}
