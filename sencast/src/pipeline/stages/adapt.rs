//! Adapter stage - runs the adapter chain over the merged products.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapter::{AdaptRequest, Adapter};
use crate::pipeline::{CellFailure, MosaicedLedger, Outcome, RunEnv, StepReport};

/// Runs every adapter in order; a failing adapter does not stop the rest.
///
/// The caller holds the adapt permit for the duration.
pub async fn adapt_stage(
    date: NaiveDate,
    adapters: &[Arc<dyn Adapter>],
    products: &MosaicedLedger,
    env: &RunEnv,
) -> Vec<StepReport> {
    let mut reports = Vec::with_capacity(adapters.len());

    for adapter in adapters {
        let name = adapter.name();
        let target = env.layout.adapter_target(name, date, adapter.extension());

        let report = if target.exists() {
            debug!(adapter = name, target = %target.display(), "Target exists, skipping");
            StepReport::done(name, Outcome::Skipped, Some(target))
        } else {
            match apply(adapter.as_ref(), date, products, &target, env).await {
                Ok(()) => StepReport::done(name, Outcome::Successful, Some(target)),
                Err(failure) => {
                    warn!(adapter = name, group = %date, error = %failure, "Adapter failed");
                    StepReport::failed(name, &failure)
                }
            }
        };
        reports.push(report);
    }

    reports
}

async fn apply(
    adapter: &dyn Adapter,
    date: NaiveDate,
    products: &MosaicedLedger,
    target: &std::path::Path,
    env: &RunEnv,
) -> Result<(), CellFailure> {
    if let Some(missing) = adapter.inputs().iter().find(|i| products.get(i).is_none()) {
        return Err(CellFailure::MissingInput(missing.clone()));
    }

    adapter
        .apply(AdaptRequest {
            date,
            products,
            target,
            env,
        })
        .await?;

    if target.exists() {
        Ok(())
    } else {
        Err(CellFailure::NoOutput(target.to_path_buf()))
    }
}
