use api_collector::config::LogFormat;
use api_collector::utils::logger;
use api_collector::{run_collection, CliConfig, TomlConfig};
use clap::Parser;

#[tokio::main]
async fn main() {
    // 先載入 .env，再讀取憑證
    dotenv::dotenv().ok();

    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting api-collector");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            match TomlConfig::from_file(path) {
                Ok(config) => run_collection(config).await,
                Err(e) => Err(e),
            }
        }
        None => run_collection(cli.clone()).await,
    };

    match result {
        Ok(summary) => {
            tracing::info!(
                "✅ {} of {} requests succeeded, {} rows, {} records skipped ({}ms)",
                summary.succeeded,
                summary.attempted,
                summary.rows,
                summary.skipped,
                (summary.finished_at - summary.started_at).num_milliseconds()
            );
            for failure in &summary.failures {
                tracing::warn!(
                    "⚠️ {} failed ({:?}{}): {}",
                    failure.term,
                    failure.kind,
                    failure
                        .status
                        .map(|s| format!(", status {}", s))
                        .unwrap_or_default(),
                    failure.message
                );
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Data collection failed: {} (Category: {:?})",
                e,
                e.category()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}
