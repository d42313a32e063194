//! Run command - full hindcast for one configuration.

use std::path::PathBuf;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub offline: bool,
    pub debug: bool,
}

/// Run the run command.
///
/// Prints the report and fails when any group was aborted by a fatal error.
/// Cell, mosaic and adapter failures are reported but do not change the
/// exit code.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), true, args.debug)?;
    runner.log_startup("run");

    let mut config = runner.config().clone();
    if args.offline {
        info!("Offline mode requested on the command line");
        config.general.offline = true;
    }

    let service = runner.create_service(config)?;
    let general = &service.config().general;
    println!(
        "Hindcast '{}' ({}, {} to {})",
        general.name,
        general.sensor,
        general.start.format("%Y-%m-%d"),
        general.end.format("%Y-%m-%d")
    );
    println!("  Processors: {}", service.processor_names().join(", "));
    if !general.adapters.is_empty() {
        println!("  Adapters:   {}", service.adapter_names().join(", "));
    }
    println!("  Output:     {}", service.env().layout.run_dir().display());
    println!();

    let report = runner
        .block_on(service.run())
        .map_err(CliError::Run)?;
    print!("{}", report);

    let failed = report.failed_groups().count();
    if failed > 0 {
        return Err(CliError::GroupsFailed {
            failed,
            total: report.groups.len(),
        });
    }

    Ok(())
}
