//! 智能体工具演示程序
//!
//! 用一段固定脚本模拟大模型的函数调用顺序，展示每个工具的输入和输出

use assist_admin::AssistConfig;
use assist_workflow::{
    tool_declarations, EmergencyDetector, EmergencyOrchestrator, FixedVoiceInput, HospitalSelector,
    LoggingAlertSink, LoggingContactNotifier, ProtocolConfig, RandomTriggerSensor,
    SimulatedAvailabilitySource, SimulatedTrafficSource, ToolCall,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AssistConfig::default();
    let selector = HospitalSelector::new(
        Arc::new(SimulatedAvailabilitySource::new(0.8, 5, 60, Some(42))?),
        Arc::new(SimulatedTrafficSource::new(2.0, 5.0, Some(43))?),
    );
    let orchestrator = EmergencyOrchestrator::new(
        ProtocolConfig::new(config.hospitals.clone(), config.contacts.clone()),
        EmergencyDetector::new(
            Arc::new(FixedVoiceInput::silent()),
            Arc::new(RandomTriggerSensor::new(0.0, None)?),
        ),
        selector,
        Arc::new(LoggingAlertSink),
        Arc::new(LoggingContactNotifier),
    );
    let toolkit = orchestrator.toolkit(config.patient.clone());

    println!("🧰 工具声明:\n{}\n", serde_json::to_string_pretty(&tool_declarations())?);

    let location = toolkit.dispatch(&ToolCall::new("get_user_location", json!({}))).await?;
    println!("📍 get_user_location -> {}", location);

    let analysis = toolkit
        .dispatch(&ToolCall::new("analyze_traffic_and_hospital_availability", json!({})))
        .await?;
    println!("🏥 analyze -> {}", serde_json::to_string_pretty(&analysis)?);

    let notify_args = match analysis["recommended_hospital_id"].as_str() {
        Some(hospital_id) => {
            let alert = toolkit
                .dispatch(&ToolCall::new(
                    "send_alert_to_hospital",
                    json!({ "hospital_id": hospital_id, "symptoms_summary": "Twisted ankle" }),
                ))
                .await?;
            println!("📨 send_alert_to_hospital -> {}", alert);
            json!({ "hospital_id": hospital_id, "alert_delivered": alert["delivered"] })
        }
        None => json!({ "symptoms_summary": "Twisted ankle" }),
    };

    let notified = toolkit
        .dispatch(&ToolCall::new("notify_emergency_contacts", notify_args))
        .await?;
    println!("📞 notify_emergency_contacts -> {}", notified);

    match toolkit.dispatch(&ToolCall::new("book_taxi", json!({}))).await {
        Ok(_) => println!("⚠️ 未知工具不应成功"),
        Err(e) => println!("❌ book_taxi -> {}", e),
    }

    Ok(())
}
