//! Processors that run an external toolkit command.

use std::path::PathBuf;
use tracing::{debug, instrument};

use super::{ProcessRequest, Processor};
use crate::command::CommandSpec;
use crate::config::{split_list, ConfigurationError, HindcastConfig, SectionParams};
use crate::pipeline::CellFailure;
use crate::BoxFuture;

/// Output extension used when a section sets none.
pub const DEFAULT_PROCESSOR_EXTENSION: &str = "nc";

/// Upstream processors each known processor reads from.
pub fn default_requires(name: &str) -> &'static [&'static str] {
    match name {
        "C2RCC" | "MPH" => &["IDEPIX"],
        "FORELULE" | "OC3" => &["POLYMER"],
        "SECCHIDEPTH" | "PRIMARYPRODUCTION" => &["C2RCC"],
        _ => &[],
    }
}

/// Runs `[processor.<NAME>] command` once per tile.
///
/// Template variables: `{input}` (Level-1 product), `{output}`,
/// `{input:<PROC>}` for every prior output of the tile, `{param:<key>}` for
/// every key of the section, plus `{wkt}`, `{sensor}` and `{resolution}`.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    name: String,
    command: CommandSpec,
    requires: Vec<String>,
    extension: String,
    params: SectionParams,
}

impl CommandProcessor {
    /// Builds the processor from its `[processor.<NAME>]` section.
    ///
    /// `command` is required; `requires` overrides the default dependencies.
    pub fn from_config(name: &str, config: &HindcastConfig) -> Result<Self, ConfigurationError> {
        Self::from_params(name, config.processor_params(name))
    }

    pub fn from_params(name: &str, params: SectionParams) -> Result<Self, ConfigurationError> {
        let command = CommandSpec::from_params(&params)?;
        let requires = match params.get("requires") {
            Some(list) => split_list(list).iter().map(|p| p.to_uppercase()).collect(),
            None => default_requires(name).iter().map(|p| p.to_string()).collect(),
        };
        let extension = params
            .get("extension")
            .unwrap_or(DEFAULT_PROCESSOR_EXTENSION)
            .trim_start_matches('.')
            .to_string();

        Ok(Self {
            name: name.to_string(),
            command,
            requires,
            extension,
            params,
        })
    }
}

impl Processor for CommandProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &[String] {
        &self.requires
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn process<'a>(&'a self, request: ProcessRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>> {
        Box::pin(self.run(request))
    }
}

impl CommandProcessor {
    #[instrument(skip_all, fields(processor = %self.name, tile = %request.l1_product.display()))]
    async fn run(&self, request: ProcessRequest<'_>) -> Result<PathBuf, CellFailure> {
        let mut vars = request.env.template_vars();
        vars.set_params(&self.params)
            .set_path("input", request.l1_product)
            .set_path("output", request.output);
        for (processor, path) in request.prior {
            vars.set_path(format!("input:{}", processor), path);
        }

        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(command = %self.command.template().as_str(), "Running processor command");
        self.command.run(&self.name, &vars).await?;
        Ok(request.output.to_path_buf())
    }
}
