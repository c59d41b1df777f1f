//! # Telemetry Sync CLI
//!
//! 命令行入口与管道编排。
//!
//! 提供：
//! - 参数解析 (clap)
//! - 配置加载与日志初始化
//! - 管道编排与运行摘要

pub mod cli;
pub mod error;
pub mod pipeline;

pub use cli::{parse_error_exit_code, Cli, LogFormat};
pub use error::{CliError, Result};
pub use pipeline::{Pipeline, PipelineConfig, PipelineStats};
