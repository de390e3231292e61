//! # 紧急救助工作流模块
//!
//! 提供一次急救事件从检测到通知的完整流程，包括：
//! - 紧急情况检测：语音指令和自动触发器
//! - 症状分诊：基于规则判断危重或中等
//! - 医院选择：综合交通时间和候诊时间给出最佳医院
//! - 告警与通知：向医院发送告警并通知紧急联系人
//! - 事件状态机：记录流程经历的每一步
//! - 智能体工具集：以函数调用工具的形式暴露上述步骤

pub mod agent;
pub mod detection;
pub mod incident;
pub mod notification;
pub mod orchestrator;
pub mod selection;
pub mod sources;
pub mod triage;

// 重新导出主要类型
pub use agent::{tool_declarations, EmergencyToolkit, ToolCall, ToolName};
pub use detection::{
    DetectionSignal, EmergencyDetector, FixedVoiceInput, RandomTriggerSensor, TriggerSensor,
    VoiceInput, DEFAULT_VOICE_PHRASE,
};
pub use incident::{IncidentEvent, IncidentRecord, IncidentStateMachine, IncidentStatus};
pub use notification::{
    notify_all, AlertSink, ContactNotifier, LoggingAlertSink, LoggingContactNotifier,
    NotificationRecord, NotificationStatus, DEFAULT_MESSAGE_TEMPLATE,
};
pub use orchestrator::{EmergencyOrchestrator, ProtocolConfig, ProtocolOutcome, ProtocolReport};
pub use selection::{
    HospitalAssessment, HospitalSelector, IntakeStatus, ScoringWeights, DEFAULT_LOOKUP_TIMEOUT,
};
pub use sources::{
    AvailabilitySource, SimulatedAvailabilitySource, SimulatedTrafficSource,
    StaticAvailabilitySource, StaticTrafficSource, TrafficSource,
};
pub use triage::SymptomTriage;
