//! 日志初始化
//!
//! 基于 `tracing-subscriber`，级别使用 EnvFilter 语法，例如 `info` 或 `assist_workflow=debug`

use crate::config::{LogFormat, LoggingConfig};
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// 构建日志过滤器，命令行指定的级别优先于配置
pub fn build_filter(config: &LoggingConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    let directives = level_override.unwrap_or(&config.level);
    EnvFilter::try_new(directives).with_context(|| format!("Invalid log level: {}", directives))
}

/// 初始化全局日志订阅器，只能调用一次
pub fn init_tracing(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let filter = build_filter(config, level_override)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_takes_precedence() {
        let config = LoggingConfig::default();
        let filter = build_filter(&config, Some("assist_workflow=debug")).unwrap();
        assert!(filter.to_string().contains("assist_workflow=debug"));
    }

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggingConfig {
            level: "info,assist_workflow=loud".to_string(),
            format: LogFormat::Pretty,
        };
        assert!(build_filter(&config, None).is_err());
    }
}
