//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{SyncConfig, SyncError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
///
/// 错误信息带上出错位置 (行:列，从 1 开始)。
pub fn parse_toml(content: &str) -> Result<SyncConfig, SyncError> {
    toml::from_str(content).map_err(|e| {
        let at = e
            .span()
            .map(|span| {
                let (line, column) = line_column(content, span.start);
                format!(" at {line}:{column}")
            })
            .unwrap_or_default();
        SyncError::Config {
            message: format!("TOML parse error{at}: {}", e.message()),
            source: Some(Box::new(e)),
        }
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SyncConfig, SyncError> {
    serde_json::from_str(content).map_err(|e| {
        let message = format!("JSON parse error at {}:{}: {e}", e.line(), e.column());
        SyncError::Config {
            message,
            source: Some(Box::new(e)),
        }
    })
}

/// 字节偏移 → (行, 列)
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
    (line, column)
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SyncConfig, SyncError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
