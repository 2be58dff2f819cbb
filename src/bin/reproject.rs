use api_collector::config::LogFormat;
use api_collector::utils::logger;
use api_collector::{reproject, CliConfig, TomlConfig};
use clap::Parser;

/// 重新從既有的原始 JSON 檔產生表格輸出，不發送任何請求
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    let result = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => reproject(&config).await,
            Err(e) => Err(e),
        },
        None => reproject(&cli).await,
    };

    match result {
        Ok(summary) => {
            println!(
                "✅ Reprojected {} records into {} rows ({} skipped)",
                summary.records, summary.rows, summary.skipped
            );
            println!("📁 Output saved to: {}", summary.table_path);
        }
        Err(e) => {
            tracing::error!("❌ Reprojection failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}
