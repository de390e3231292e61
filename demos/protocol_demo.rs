//! 急救流程演示程序
//!
//! 使用默认配置和固定数据源，依次演示危重、中等和无可用医院三种情况

use assist_admin::AssistConfig;
use assist_core::{AvailabilityReport, TrafficReport};
use assist_workflow::{
    EmergencyDetector, EmergencyOrchestrator, FixedVoiceInput, HospitalSelector, LoggingAlertSink,
    LoggingContactNotifier, ProtocolConfig, ProtocolOutcome, RandomTriggerSensor,
    StaticAvailabilitySource, StaticTrafficSource,
};
use std::sync::Arc;

fn orchestrator(config: &AssistConfig, hospitals_open: bool) -> anyhow::Result<EmergencyOrchestrator> {
    let mut availability = StaticAvailabilitySource::new();
    let mut traffic = StaticTrafficSource::new();
    for (i, hospital) in config.hospitals.iter().enumerate() {
        let i = i as u32;
        availability = availability.with_report(
            hospital.id.clone(),
            AvailabilityReport {
                available: hospitals_open,
                wait_time_minutes: 10 + 20 * i,
            },
        );
        traffic = traffic.with_report(
            hospital.coordinates,
            TrafficReport {
                travel_time_minutes: 8 - 3 * i.min(2),
                distance_km: 0.4 + 0.3 * i as f64,
            },
        );
    }

    let detector = EmergencyDetector::new(
        Arc::new(FixedVoiceInput::default()),
        Arc::new(RandomTriggerSensor::new(0.0, Some(7))?),
    );

    Ok(EmergencyOrchestrator::new(
        ProtocolConfig::new(config.hospitals.clone(), config.contacts.clone()),
        detector,
        HospitalSelector::new(Arc::new(availability), Arc::new(traffic)),
        Arc::new(LoggingAlertSink),
        Arc::new(LoggingContactNotifier),
    ))
}

fn describe(outcome: &ProtocolOutcome) -> String {
    match outcome {
        ProtocolOutcome::NoEmergencyDetected => "未检测到紧急情况".to_string(),
        ProtocolOutcome::CriticalEscalation { triage, .. } => format!("危重: {}", triage.summary),
        ProtocolOutcome::HospitalAlerted { hospital, .. } => format!("已通知医院: {}", hospital.name),
        ProtocolOutcome::NoAvailableHospital { .. } => "没有可用医院".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let config = AssistConfig::default();
    let patient = config.patient.clone();

    println!("🚑 紧急救助流程演示\n");

    // 1. 语音指令触发，危重情况
    let report = orchestrator(&config, true)?.execute_protocol(&patient).await?;
    println!("1️⃣ 语音指令: {}", describe(&report.outcome));
    println!("   事件轨迹: {:?}", report.incident.events());

    // 2. 中等情况，选择综合得分最高的医院
    let report = orchestrator(&config, true)?
        .respond_to(&patient, "Twisted ankle, mild swelling")
        .await?;
    println!("2️⃣ 扭伤: {}", describe(&report.outcome));
    println!("   通知联系人: {}", report.outcome.contacts_notified());

    // 3. 所有医院都在分流
    let report = orchestrator(&config, false)?
        .respond_to(&patient, "High fever")
        .await?;
    println!("3️⃣ 高烧: {}", describe(&report.outcome));

    // 4. 排名明细
    let ranking = orchestrator(&config, true)?
        .selector()
        .rank(&patient, &config.hospitals)
        .await;
    println!("\n📊 医院排名:");
    for candidate in ranking {
        println!(
            "   {} 得分 {:.3} (路程 {} 分钟, 候诊 {} 分钟)",
            candidate.hospital.name,
            candidate.score,
            candidate.travel_time_minutes,
            candidate.wait_time_minutes
        );
    }

    Ok(())
}
