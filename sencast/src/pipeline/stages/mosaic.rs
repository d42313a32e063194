//! Mosaic stage - one merged product per processor.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::mosaic::{Mosaic, MosaicRequest};
use crate::pipeline::output::{reusable_output, verify_output};
use crate::pipeline::{MosaicedLedger, Outcome, ProductLedger, RunEnv, StepReport};
use crate::processor::Processor;
use crate::scene::ResolvedScene;

/// Builds the mosaiced ledger from the per-tile ledger.
///
/// - no tile output: the processor gets no entry and no report
/// - one tile output: passed through unchanged
/// - several: merged into the deterministic mosaic path
pub async fn mosaic_stage(
    date: NaiveDate,
    scenes: &[ResolvedScene],
    processors: &[Arc<dyn Processor>],
    ledger: &ProductLedger,
    mosaic: &dyn Mosaic,
    env: &RunEnv,
) -> (MosaicedLedger, Vec<StepReport>) {
    let tiles: Vec<&Path> = scenes.iter().map(|s| s.path.as_path()).collect();
    let mut products = MosaicedLedger::new();
    let mut reports = Vec::new();

    for processor in processors {
        let name = processor.name();
        let outputs: Vec<PathBuf> = ledger
            .outputs(name, &tiles)
            .into_iter()
            .map(Path::to_path_buf)
            .collect();

        match outputs.as_slice() {
            [] => debug!(processor = name, "No tile output, nothing to mosaic"),
            [single] => products.insert(name, single.clone()),
            _ => {
                let output = env.layout.mosaic_output(name, date, processor.extension());
                if reusable_output(&output, env.min_output_bytes) {
                    products.insert(name, output.clone());
                    reports.push(StepReport::done(name, Outcome::Skipped, Some(output)));
                    continue;
                }

                let request = MosaicRequest {
                    processor: name,
                    inputs: &outputs,
                    output: &output,
                    env,
                };
                let result = match mosaic.combine(request).await {
                    Ok(produced) => verify_output(&produced, env.min_output_bytes).map(|()| produced),
                    Err(failure) => Err(failure),
                };
                match result {
                    Ok(produced) => {
                        products.insert(name, produced.clone());
                        reports.push(StepReport::done(name, Outcome::Successful, Some(produced)));
                    }
                    Err(failure) => {
                        warn!(processor = name, tiles = outputs.len(), error = %failure, "Mosaic failed");
                        reports.push(StepReport::failed(name, &failure));
                    }
                }
            }
        }
    }

    (products, reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::testing::{date, env, tile, write_sized};
    use crate::pipeline::CellFailure;
    use crate::processor::{ProcessRequest, DEFAULT_PROCESSOR_EXTENSION};
    use crate::BoxFuture;
    use tempfile::TempDir;

    /// Only its name matters here; the mosaic stage never runs processors.
    struct Named(&'static str);

    impl Processor for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn process<'a>(&'a self, _request: ProcessRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>> {
            Box::pin(async move { Err(CellFailure::NotConfigured(self.0.to_string())) })
        }
    }

    /// Merges by writing the output, except for one processor.
    struct FailingFor(&'static str);

    impl Mosaic for FailingFor {
        fn combine<'a>(&'a self, request: MosaicRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>> {
            Box::pin(async move {
                if request.processor == self.0 {
                    return Err(CellFailure::Failed("gpt mosaic exited with 1".into()));
                }
                Ok(write_sized(request.output, 64))
            })
        }
    }

    fn processors(names: &[&'static str]) -> Vec<Arc<dyn Processor>> {
        names
            .iter()
            .map(|n| Arc::new(Named(*n)) as Arc<dyn Processor>)
            .collect()
    }

    #[tokio::test]
    async fn test_failed_mosaic_does_not_affect_other_processors() {
        let temp = TempDir::new().unwrap();
        let env = env(temp.path(), 1);
        let scenes = vec![tile(temp.path(), "32TLS"), tile(temp.path(), "32TMS")];
        let mut ledger = ProductLedger::new();
        for processor in ["IDEPIX", "C2RCC"] {
            for scene in &scenes {
                let output = env
                    .layout
                    .processor_output(processor, &scene.path, DEFAULT_PROCESSOR_EXTENSION);
                ledger.record(&scene.path, processor, write_sized(&output, 8));
            }
        }
        // ACOLITE survived on one tile only.
        let acolite = env
            .layout
            .processor_output("ACOLITE", &scenes[1].path, DEFAULT_PROCESSOR_EXTENSION);
        ledger.record(&scenes[1].path, "ACOLITE", write_sized(&acolite, 8));

        let (products, reports) = mosaic_stage(
            date(),
            &scenes,
            &processors(&["IDEPIX", "C2RCC", "ACOLITE"]),
            &ledger,
            &FailingFor("IDEPIX"),
            &env,
        )
        .await;

        assert!(products.get("IDEPIX").is_none());
        let failed = reports.iter().find(|r| r.name == "IDEPIX").unwrap();
        assert!(failed.outcome.is_failure());
        assert!(failed.error.as_deref().unwrap().contains("exited with 1"));

        let merged = env
            .layout
            .mosaic_output("C2RCC", date(), DEFAULT_PROCESSOR_EXTENSION);
        assert_eq!(products.get("C2RCC"), Some(merged.as_path()));
        let succeeded = reports.iter().find(|r| r.name == "C2RCC").unwrap();
        assert_eq!(succeeded.outcome, Outcome::Successful);

        // A single surviving tile passes through without a merge.
        assert_eq!(products.get("ACOLITE"), Some(acolite.as_path()));
        assert!(reports.iter().all(|r| r.name != "ACOLITE"));
        assert_eq!(reports.len(), 2);
    }

    #[tokio::test]
    async fn test_processor_without_outputs_gets_no_entry() {
        let temp = TempDir::new().unwrap();
        let env = env(temp.path(), 1);
        let scenes = vec![tile(temp.path(), "32TLS"), tile(temp.path(), "32TMS")];

        let (products, reports) = mosaic_stage(
            date(),
            &scenes,
            &processors(&["IDEPIX"]),
            &ProductLedger::new(),
            &FailingFor("NONE"),
            &env,
        )
        .await;

        assert!(products.is_empty());
        assert!(reports.is_empty());
    }
}
