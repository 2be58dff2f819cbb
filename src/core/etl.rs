use crate::adapters::storage::LocalStorage;
use crate::core::collector::ApiCollector;
use crate::core::projection::Projector;
use crate::domain::model::{Credential, ReprojectSummary, RunSummary};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::Validate;
use chrono::Utc;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();

        // Extract
        let collection = self.pipeline.extract().await?;
        if collection.attempted == 0 {
            return Err(CollectorError::ConfigError {
                message: "No requests could be attempted".to_string(),
            });
        }
        tracing::info!(
            "Collected {} of {} responses ({} failed)",
            collection.responses.len(),
            collection.attempted,
            collection.failures.len()
        );

        // Transform
        let result = self.pipeline.transform(&collection).await?;
        let rows = result.projection.rows.len();
        let skipped = result.projection.skipped.len();
        tracing::info!("Projected {} rows ({} records skipped)", rows, skipped);

        // Load
        let outputs = self.pipeline.load(result).await?;
        tracing::info!("📁 Raw responses saved to: {}", outputs.raw_path);
        tracing::info!("📁 Processed table saved to: {}", outputs.table_path);

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            attempted: collection.attempted,
            succeeded: collection.responses.len(),
            failures: collection.failures,
            rows,
            skipped,
            outputs,
        })
    }
}

/// 完整的收集流程：驗證設定、讀取憑證、依序請求、寫出兩個檔案。
///
/// 憑證缺少時在任何網路請求之前就回傳錯誤。
pub async fn run_collection<C: ConfigProvider + Validate>(config: C) -> Result<RunSummary> {
    config.validate()?;
    let credential = Credential::from_env(config.credential_var())?;

    println!("Starting data collection...");

    let storage = LocalStorage::new(config.output_path().to_string());
    let collector = ApiCollector::new(storage, config, credential)?;
    let summary = EtlEngine::new(collector).run().await?;

    println!("Data collection complete!");
    Ok(summary)
}

/// Rebuilds the tabular file from an existing raw file. No network access.
pub async fn reproject<C: ConfigProvider + Validate>(config: &C) -> Result<ReprojectSummary> {
    config.validate()?;

    let storage = LocalStorage::new(config.output_path().to_string());
    let raw = storage.read_file(config.raw_file()).await?;

    let projector = Projector::from_config(config);
    let (projection, output) = projector.project_raw(&raw)?;
    storage.write_file(config.table_file(), &output).await?;

    Ok(ReprojectSummary {
        records: projection.records,
        rows: projection.rows.len(),
        skipped: projection.skipped.len(),
        table_path: storage.location(config.table_file()),
    })
}
