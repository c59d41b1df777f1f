//! # Telemetry Sync CLI
//!
//! 命令行接口入口点。
//!
//! `telemetry-sync <data_dir> <video>`：参数个数错误时打印用法并以 1 退出，
//! 其余失败按错误分类返回退出码。

use std::process::ExitCode;

use clap::Parser;
use config_loader::ConfigLoader;
use frame_extractor::FfmpegDecoder;
use ingestion::LocalFileSystem;
use observability::{record_run_outcome, ObservabilityConfig};
use tracing::{error, info};

use telemetry_sync_cli::{parse_error_exit_code, Cli, CliError, Pipeline, PipelineConfig, Result};

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(parse_error_exit_code(&err));
        }
    };

    if let Err(e) = init_logging(&cli) {
        eprintln!("error: {e}");
        return ExitCode::from(e.exit_code());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry Sync starting"
    );

    match run(&cli) {
        Ok(()) => {
            record_run_outcome(true);
            ExitCode::SUCCESS
        }
        Err(e) => {
            record_run_outcome(false);
            error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let sync = ConfigLoader::load_or_default(cli.config.as_deref())?;
    let decoder = FfmpegDecoder::new(&sync.decoder);
    let fs = LocalFileSystem::new();

    let pipeline = Pipeline::new(
        &fs,
        &decoder,
        PipelineConfig {
            sync,
            dry_run: cli.dry_run,
        },
    );
    let stats = pipeline.run(&cli.data_dir, &cli.video)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::summary(e.to_string()))?;
        println!("{json}");
    } else if !cli.quiet {
        stats.print_summary();
    }
    Ok(())
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let config = ObservabilityConfig::from_verbosity(cli.log_format.into(), cli.verbose, cli.quiet);
    observability::init_with_config(config).map_err(CliError::Logging)
}
