//! Search command - catalog search without processing.

use std::path::PathBuf;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the search command.
#[derive(Debug, Default)]
pub struct SearchArgs {
    pub config: Option<PathBuf>,
}

/// Lists every scene the run would use, and whether it is on disk.
pub fn run(args: SearchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), false, false)?;
    runner.log_startup("search");

    let service = runner.create_service(runner.config().clone())?;
    let search = runner
        .block_on(service.search())
        .map_err(CliError::Search)?;
    let availability = &search.availability;

    for scene in &availability.scenes {
        let status = if scene.download_required {
            "download"
        } else {
            "local"
        };
        println!("{}  {:<8}  {}", scene.sensing_date(), status, scene.name());
    }

    println!();
    println!(
        "{} scene(s) found via {}: {} local, {} to download",
        search.found,
        service.provider_name(),
        availability.available,
        availability.to_download
    );
    if availability.dropped > 0 {
        println!(
            "{} scene(s) missing locally were dropped (offline)",
            availability.dropped
        );
    }

    Ok(())
}
