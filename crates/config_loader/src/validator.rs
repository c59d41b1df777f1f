//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (非空字符串、target_fps > 0、1 <= jpeg_quality <= 100)
//! - 三个 selector 互不相同
//! - 帧列名互不相同，且不与 merge_key 冲突
//! - output_file / frames.dir_name 为单一文件名

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{SyncConfig, SyncError};

/// 校验 SyncConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &SyncConfig) -> Result<(), SyncError> {
    validate_fields(config)?;
    validate_selectors(config)?;
    validate_frame_columns(config)?;
    validate_file_names(config)?;
    Ok(())
}

/// 字段级规则 (derive 生成)
fn validate_fields(config: &SyncConfig) -> Result<(), SyncError> {
    config.validate().map_err(|errors| {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        SyncError::config_validation(field, errors.to_string())
    })
}

/// 校验 selector 唯一性
fn validate_selectors(config: &SyncConfig) -> Result<(), SyncError> {
    let selectors = &config.selectors;
    let mut seen = HashSet::new();
    for (field, value) in [
        ("selectors.gps", &selectors.gps),
        ("selectors.accl", &selectors.accl),
        ("selectors.gyro", &selectors.gyro),
    ] {
        if !seen.insert(value.as_str()) {
            return Err(SyncError::config_validation(
                field,
                format!("duplicate selector '{value}'"),
            ));
        }
    }
    Ok(())
}

/// 校验帧列名
fn validate_frame_columns(config: &SyncConfig) -> Result<(), SyncError> {
    let frames = &config.frames;

    if frames.path_column == frames.timestamp_column {
        return Err(SyncError::config_validation(
            "frames.path_column",
            format!(
                "path_column and timestamp_column must differ, both are '{}'",
                frames.path_column
            ),
        ));
    }

    for (field, column) in [
        ("frames.path_column", &frames.path_column),
        ("frames.timestamp_column", &frames.timestamp_column),
    ] {
        if *column == config.merge_key {
            return Err(SyncError::config_validation(
                field,
                format!("'{column}' collides with merge_key"),
            ));
        }
    }
    Ok(())
}

/// 校验输出文件名与帧目录名
fn validate_file_names(config: &SyncConfig) -> Result<(), SyncError> {
    for (field, name) in [
        ("output_file", &config.output_file),
        ("frames.dir_name", &config.frames.dir_name),
    ] {
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SyncError::config_validation(
                field,
                format!("'{name}' must be a plain file name inside the data directory"),
            ));
        }
    }
    Ok(())
}
