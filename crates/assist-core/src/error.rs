//! 错误定义模块

use thiserror::Error;

/// 急救助手统一错误类型
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("医院可用性查询失败: {0}")]
    Availability(String),

    #[error("交通分析失败: {0}")]
    Traffic(String),

    #[error("医院告警发送失败: {0}")]
    Alert(String),

    #[error("紧急联系人通知失败: {0}")]
    Notification(String),

    #[error("紧急情况检测失败: {0}")]
    Detection(String),

    #[error("外部调用超时: {0}")]
    Timeout(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("未知工具: {0}")]
    UnknownTool(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 急救助手统一结果类型
pub type Result<T> = std::result::Result<T, AssistError>;
