//! Processor stage - runs the processor chain over every surviving tile.
//!
//! Processors run in configured order; for each processor every tile is
//! handled before the next processor starts, so a processor always sees the
//! outputs of its predecessors for the same tile. Each (tile, processor) cell
//! is isolated: its failure is recorded and the loop moves on.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::pipeline::output::{reusable_output, verify_output};
use crate::pipeline::{CellFailure, CellReport, Outcome, ProductLedger, RunEnv};
use crate::processor::{ProcessRequest, Processor};
use crate::scene::ResolvedScene;

/// Runs all processors over all tiles.
///
/// The caller holds the process permit for the duration.
pub async fn process_stage(
    scenes: &[ResolvedScene],
    processors: &[Arc<dyn Processor>],
    env: &RunEnv,
) -> (ProductLedger, Vec<CellReport>) {
    let mut ledger = ProductLedger::new();
    let mut cells = Vec::with_capacity(scenes.len() * processors.len());

    for processor in processors {
        for scene in scenes {
            let result = run_cell(processor.as_ref(), scene, &ledger, env).await;
            let cell = match result {
                Ok((outcome, output)) => {
                    debug!(processor = processor.name(), tile = scene.name(), %outcome, "Cell done");
                    ledger.record(&scene.path, processor.name(), output.clone());
                    CellReport {
                        tile: scene.name().to_string(),
                        processor: processor.name().to_string(),
                        outcome,
                        output: Some(output),
                        error: None,
                    }
                }
                Err(failure) => {
                    warn!(
                        processor = processor.name(),
                        tile = scene.name(),
                        error = %failure,
                        "Processor failed for tile"
                    );
                    CellReport {
                        tile: scene.name().to_string(),
                        processor: processor.name().to_string(),
                        outcome: failure.outcome(),
                        output: None,
                        error: Some(failure.to_string()),
                    }
                }
            };
            cells.push(cell);
        }
    }

    info!(
        cells = cells.len(),
        outputs = ledger.len(),
        "Processor chain finished"
    );
    (ledger, cells)
}

async fn run_cell(
    processor: &dyn Processor,
    scene: &ResolvedScene,
    ledger: &ProductLedger,
    env: &RunEnv,
) -> Result<(Outcome, PathBuf), CellFailure> {
    let output = env
        .layout
        .processor_output(processor.name(), &scene.path, processor.extension());
    if reusable_output(&output, env.min_output_bytes) {
        return Ok((Outcome::Skipped, output));
    }

    let prior = ledger.products(&scene.path);
    if let Some(missing) = processor.requires().iter().find(|r| !prior.contains_key(*r)) {
        return Err(CellFailure::MissingInput(missing.clone()));
    }

    let produced = processor
        .process(ProcessRequest {
            l1_product: &scene.path,
            prior: &prior,
            output: &output,
            env,
        })
        .await?;
    verify_output(&produced, env.min_output_bytes)?;
    Ok((Outcome::Successful, produced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::testing::{env, tile, write_sized};
    use crate::processor::DEFAULT_PROCESSOR_EXTENSION;
    use crate::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes `bytes` bytes per cell, or fails for tiles containing `fail_on`.
    struct SizedProcessor {
        name: String,
        requires: Vec<String>,
        bytes: usize,
        fail_on: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl SizedProcessor {
        fn new(name: &str, bytes: usize) -> Self {
            Self {
                name: name.to_string(),
                requires: Vec::new(),
                bytes,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn requiring(mut self, name: &str) -> Self {
            self.requires.push(name.to_string());
            self
        }

        fn failing_on(mut self, tile: &'static str) -> Self {
            self.fail_on = Some(tile);
            self
        }
    }

    impl Processor for SizedProcessor {
        fn name(&self) -> &str {
            &self.name
        }

        fn requires(&self) -> &[String] {
            &self.requires
        }

        fn process<'a>(&'a self, request: ProcessRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(tile) = self.fail_on {
                    if request.l1_product.to_string_lossy().contains(tile) {
                        return Err(CellFailure::Failed(format!("{} crashed", self.name)));
                    }
                }
                Ok(write_sized(request.output, self.bytes))
            })
        }
    }

    #[tokio::test]
    async fn test_undersized_output_is_failed_and_not_recorded() {
        let temp = TempDir::new().unwrap();
        let env = env(temp.path(), 16);
        let scenes = vec![tile(temp.path(), "32TLS")];
        let processors: Vec<Arc<dyn Processor>> = vec![Arc::new(SizedProcessor::new("IDEPIX", 3))];

        let (ledger, cells) = process_stage(&scenes, &processors, &env).await;

        assert!(ledger.is_empty());
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].outcome, Outcome::FailedUndersized);
        assert_eq!(cells[0].outcome.as_str(), "failed (empty/undersized output)");
        assert!(cells[0].output.is_none());
        assert!(cells[0].error.as_deref().unwrap().contains("undersized"));

        let output = env
            .layout
            .processor_output("IDEPIX", &scenes[0].path, DEFAULT_PROCESSOR_EXTENSION);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_failed_cell_only_blocks_its_dependents() {
        let temp = TempDir::new().unwrap();
        let env = env(temp.path(), 1);
        let scenes = vec![tile(temp.path(), "32TLS"), tile(temp.path(), "32TMS")];
        let idepix = Arc::new(SizedProcessor::new("IDEPIX", 8).failing_on("32TLS"));
        let c2rcc = Arc::new(SizedProcessor::new("C2RCC", 8).requiring("IDEPIX"));
        let acolite = Arc::new(SizedProcessor::new("ACOLITE", 8));
        let processors: Vec<Arc<dyn Processor>> = vec![
            idepix.clone() as Arc<dyn Processor>,
            c2rcc.clone() as Arc<dyn Processor>,
            acolite.clone() as Arc<dyn Processor>,
        ];

        let (ledger, cells) = process_stage(&scenes, &processors, &env).await;

        let (failed, good) = (&scenes[0].path, &scenes[1].path);
        assert!(!ledger.contains(failed, "IDEPIX"));
        assert!(!ledger.contains(failed, "C2RCC"));
        assert!(ledger.contains(failed, "ACOLITE"));
        for processor in ["IDEPIX", "C2RCC", "ACOLITE"] {
            assert!(ledger.contains(good, processor));
        }

        let cell = cells
            .iter()
            .find(|c| c.tile == scenes[0].name() && c.processor == "C2RCC")
            .unwrap();
        assert_eq!(cell.outcome, Outcome::FailedNoOutput);
        assert!(cell.error.as_deref().unwrap().contains("IDEPIX"));

        // The dependent cell was never handed to the processor.
        assert_eq!(idepix.calls.load(Ordering::SeqCst), 2);
        assert_eq!(c2rcc.calls.load(Ordering::SeqCst), 1);
        assert_eq!(acolite.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_existing_output_is_skipped() {
        let temp = TempDir::new().unwrap();
        let env = env(temp.path(), 4);
        let scenes = vec![tile(temp.path(), "32TLS")];
        let output = env
            .layout
            .processor_output("IDEPIX", &scenes[0].path, DEFAULT_PROCESSOR_EXTENSION);
        write_sized(&output, 32);
        let idepix = Arc::new(SizedProcessor::new("IDEPIX", 8));
        let processors: Vec<Arc<dyn Processor>> = vec![idepix.clone() as Arc<dyn Processor>];

        let (ledger, cells) = process_stage(&scenes, &processors, &env).await;

        assert_eq!(cells[0].outcome, Outcome::Skipped);
        assert_eq!(ledger.get(&scenes[0].path, "IDEPIX"), Some(output.as_path()));
        assert_eq!(idepix.calls.load(Ordering::SeqCst), 0);
    }
}
