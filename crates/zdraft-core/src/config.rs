//! 内核配置
//!
//! 从 JSON 加载，缺省字段使用默认值。

use crate::snap::SnapConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// 内核配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// 对象捕捉
    pub snap: SnapConfig,
    /// 整圆离散化段数
    pub arc_segment_count: usize,
    pub default_stroke_color: u32,
    pub default_stroke_width: f64,
    pub default_font_size: f64,
    pub default_font_family: String,
    pub default_text_color: u32,
    /// 点选容差（世界坐标）
    pub hit_tolerance: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            snap: SnapConfig::default(),
            arc_segment_count: 72,
            default_stroke_color: 0x000000,
            default_stroke_width: 1.0,
            default_font_size: 16.0,
            default_font_family: "monospace".to_string(),
            default_text_color: 0x000000,
            hit_tolerance: 3.0,
        }
    }
}

impl KernelConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!("Loaded kernel config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.arc_segment_count < 4 {
            return Err(ConfigError::Invalid(format!(
                "arc_segment_count must be at least 4, got {}",
                self.arc_segment_count
            )));
        }
        if !(self.hit_tolerance.is_finite() && self.hit_tolerance >= 0.0) {
            return Err(ConfigError::Invalid("hit_tolerance must be non-negative".into()));
        }
        if !(self.snap.grid_spacing.is_finite() && self.snap.grid_spacing > 0.0) {
            return Err(ConfigError::Invalid("snap.grid_spacing must be positive".into()));
        }
        Ok(())
    }
}
