//! Shared fixtures for the stage tests.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::config::HindcastConfig;
use crate::pipeline::RunEnv;
use crate::scene::{ResolvedScene, SceneDescriptor};

/// Run environment writing under `output`, with a small size threshold.
pub fn env(output: &Path, min_output_bytes: u64) -> RunEnv {
    let ini = format!(
        "[general]\n\
         name = lake\n\
         wkt = POLYGON ((6.1 46.2, 6.9 46.2, 6.9 46.5, 6.1 46.5, 6.1 46.2))\n\
         sensor = MSI\n\
         start = 2021-07-01\n\
         end = 2021-07-01\n\
         processors = IDEPIX\n\
         output_directory = {}\n",
        output.display()
    );
    let config = HindcastConfig::from_ini_str(&ini, Path::new("/")).unwrap();
    let mut env = RunEnv::from_config(&config).unwrap();
    env.min_output_bytes = min_output_bytes;
    env
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 7, 1).unwrap()
}

/// A Sentinel-2 tile sensed on [`date`], stored under `l1_root`.
pub fn tile(l1_root: &Path, tile: &str) -> ResolvedScene {
    let name = format!(
        "S2B_MSIL1C_20210701T103029_N0301_R108_T{}_20210701T124106.SAFE",
        tile
    );
    ResolvedScene {
        descriptor: SceneDescriptor::from_product_name(name.clone(), &name).unwrap(),
        path: l1_root.join(&name),
        download_required: false,
    }
}

/// Writes `bytes` bytes at `path`, creating parent directories.
pub fn write_sized(path: &Path, bytes: usize) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![b'x'; bytes]).unwrap();
    path.to_path_buf()
}
