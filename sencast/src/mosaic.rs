//! Merging per-tile outputs of one processor into a single product.

use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::command::{CommandSpec, CommandTemplate};
use crate::config::{ConfigurationError, MosaicSettings};
use crate::pipeline::{CellFailure, RunEnv};
use crate::BoxFuture;

/// Input of one merge.
#[derive(Debug, Clone, Copy)]
pub struct MosaicRequest<'a> {
    pub processor: &'a str,
    /// Per-tile outputs, at least two
    pub inputs: &'a [PathBuf],
    pub output: &'a Path,
    pub env: &'a RunEnv,
}

/// Combines several tile outputs into one.
pub trait Mosaic: Send + Sync {
    fn combine<'a>(&'a self, request: MosaicRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>>;
}

/// Runs the `[mosaic] command` template with `{inputs}` and `{output}`.
///
/// Without a command every merge fails as a cell failure; single-tile
/// groups never reach this point.
#[derive(Debug, Clone, Default)]
pub struct CommandMosaic {
    command: Option<CommandSpec>,
}

impl CommandMosaic {
    pub fn new(command: Option<CommandSpec>) -> Self {
        Self { command }
    }

    pub fn from_settings(settings: &MosaicSettings) -> Result<Self, ConfigurationError> {
        let command = match settings.command.as_deref() {
            None => None,
            Some(template) => {
                let template =
                    CommandTemplate::parse(template).map_err(|e| ConfigurationError::InvalidValue {
                        section: "mosaic".to_string(),
                        key: "command".to_string(),
                        value: template.to_string(),
                        reason: e.to_string(),
                    })?;
                Some(CommandSpec::new(template, settings.attempts, settings.timeout))
            }
        };
        Ok(Self { command })
    }

    pub fn is_configured(&self) -> bool {
        self.command.is_some()
    }
}

impl Mosaic for CommandMosaic {
    fn combine<'a>(&'a self, request: MosaicRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>> {
        Box::pin(self.run(request))
    }
}

impl CommandMosaic {
    #[instrument(skip_all, fields(processor = request.processor, tiles = request.inputs.len()))]
    async fn run(&self, request: MosaicRequest<'_>) -> Result<PathBuf, CellFailure> {
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| CellFailure::NotConfigured("[mosaic] command is not set".to_string()))?;

        let mut vars = request.env.template_vars();
        vars.set("processor", request.processor)
            .set_path("output", request.output)
            .set_list(
                "inputs",
                request.inputs.iter().map(|p| p.to_string_lossy().into_owned()),
            );

        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(command = %command.template().as_str(), "Running mosaic command");
        command.run("mosaic", &vars).await?;
        Ok(request.output.to_path_buf())
    }
}
