//! # 急救助手管理模块
//!
//! 提供配置加载与验证、日志初始化等运维功能

pub mod config;
pub mod logging;

pub use config::{
    AssistConfig, ConfigManager, ConfigValidator, LogFormat, LoggingConfig, SelectionConfig,
    SimulationConfig,
};
pub use logging::{build_filter, init_tracing};
