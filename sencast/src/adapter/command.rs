//! Adapters that run an external command over the merged products.

use tracing::{debug, instrument};

use super::{AdaptRequest, Adapter};
use crate::command::CommandSpec;
use crate::config::{ConfigurationError, HindcastConfig, SectionParams};
use crate::pipeline::CellFailure;
use crate::BoxFuture;

fn default_extension(name: &str) -> &'static str {
    match name {
        "QLRGB" | "QLSINGLEBAND" => "png",
        "GEOTIFF" => "tif",
        "DATALAKES" => "json",
        _ => "",
    }
}

/// Runs `[adapter.<NAME>] command` once per group.
///
/// Template variables: `{output}` (the adapter target), `{date}`,
/// `{input:<PROC>}` for every merged product, `{inputs}` for the products
/// listed in `inputs`, `{param:<key>}`, `{wkt}`, `{sensor}`, `{resolution}`.
#[derive(Debug, Clone)]
pub struct CommandAdapter {
    name: String,
    command: CommandSpec,
    inputs: Vec<String>,
    extension: String,
    params: SectionParams,
}

impl CommandAdapter {
    pub fn from_config(name: &str, config: &HindcastConfig) -> Result<Self, ConfigurationError> {
        Self::from_params(name, config.adapter_params(name))
    }

    pub fn from_params(name: &str, params: SectionParams) -> Result<Self, ConfigurationError> {
        let command = CommandSpec::from_params(&params)?;
        let inputs = params
            .list("inputs")
            .into_iter()
            .map(|p| p.to_uppercase())
            .collect();
        let extension = params
            .get("target")
            .unwrap_or_else(|| default_extension(name))
            .trim_start_matches('.')
            .to_string();

        Ok(Self {
            name: name.to_string(),
            command,
            inputs,
            extension,
            params,
        })
    }
}

impl Adapter for CommandAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn apply<'a>(&'a self, request: AdaptRequest<'a>) -> BoxFuture<'a, Result<(), CellFailure>> {
        Box::pin(self.run(request))
    }
}

impl CommandAdapter {
    #[instrument(skip_all, fields(adapter = %self.name, group = %request.date))]
    async fn run(&self, request: AdaptRequest<'_>) -> Result<(), CellFailure> {
        let mut vars = request.env.template_vars();
        vars.set_params(&self.params)
            .set_path("output", request.target)
            .set("date", request.date.format("%Y%m%d").to_string());
        for (processor, path) in request.products.iter() {
            vars.set_path(format!("input:{}", processor), path);
        }

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for processor in &self.inputs {
            let path = request
                .products
                .get(processor)
                .ok_or_else(|| CellFailure::MissingInput(processor.clone()))?;
            inputs.push(path.to_string_lossy().into_owned());
        }
        vars.set_list("inputs", inputs);

        if let Some(parent) = request.target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(command = %self.command.template().as_str(), "Running adapter command");
        self.command.run(&self.name, &vars).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{MosaicedLedger, RunEnv};
    use chrono::NaiveDate;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn config(output: &Path, sections: &str) -> HindcastConfig {
        let ini = format!(
            "[general]\n\
             wkt = POLYGON ((6.1 46.2, 6.9 46.2, 6.9 46.5, 6.1 46.5, 6.1 46.2))\n\
             sensor = OLCI\n\
             start = 2021-07-01\n\
             end = 2021-07-01\n\
             processors = C2RCC\n\
             adapters = QLRGB\n\
             output_directory = {}\n\
             {}",
            output.display(),
            sections
        );
        HindcastConfig::from_ini_str(&ini, Path::new("/")).unwrap()
    }

    #[test]
    fn test_from_config() {
        let temp = TempDir::new().unwrap();
        let config = config(
            temp.path(),
            "[adapter.QLRGB]\ncommand = ql {input:C2RCC} {output}\ninputs = c2rcc\n",
        );

        let adapter = CommandAdapter::from_config("QLRGB", &config).unwrap();
        assert_eq!(adapter.inputs(), &["C2RCC".to_string()]);
        assert_eq!(adapter.extension(), "png");
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_running() {
        let temp = TempDir::new().unwrap();
        let config = config(
            temp.path(),
            "[adapter.QLRGB]\ncommand = sencast-no-such-program {output}\ninputs = C2RCC\n",
        );
        let env = RunEnv::from_config(&config).unwrap();
        let adapter = CommandAdapter::from_config("QLRGB", &config).unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        let target = env.layout.adapter_target("QLRGB", date, adapter.extension());
        let products = MosaicedLedger::new();

        let result = adapter
            .apply(AdaptRequest {
                date,
                products: &products,
                target: &target,
                env: &env,
            })
            .await;

        assert_eq!(result, Err(CellFailure::MissingInput("C2RCC".into())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apply_runs_command() {
        let temp = TempDir::new().unwrap();
        let config = config(
            temp.path(),
            "[adapter.QLRGB]\ncommand = cp {inputs} {output}\ninputs = C2RCC\n",
        );
        let env = RunEnv::from_config(&config).unwrap();
        let adapter = CommandAdapter::from_config("QLRGB", &config).unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        let target = env.layout.adapter_target("QLRGB", date, adapter.extension());

        let source = temp.path().join("c2rcc.nc");
        std::fs::write(&source, b"data").unwrap();
        let mut products = MosaicedLedger::new();
        products.insert("C2RCC", PathBuf::from(&source));

        adapter
            .apply(AdaptRequest {
                date,
                products: &products,
                target: &target,
                env: &env,
            })
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }
}
