//! 急救助手主程序

use anyhow::{Context, Result};
use assist_admin::{init_tracing, AssistConfig, ConfigManager};
use assist_core::{Coordinates, PatientContext};
use assist_workflow::{
    tool_declarations, EmergencyDetector, EmergencyOrchestrator, FixedVoiceInput, HospitalSelector,
    LoggingAlertSink, LoggingContactNotifier, ProtocolConfig, ProtocolOutcome, RandomTriggerSensor,
    ScoringWeights, SimulatedAvailabilitySource, SimulatedTrafficSource,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 急救助手命令行参数
#[derive(Parser, Debug)]
#[command(name = "assist-runner")]
#[command(about = "紧急救助助手：检测、分诊、选择医院并通知联系人")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 症状描述，指定后跳过紧急情况检测
    #[arg(short, long)]
    description: Option<String>,

    /// 患者地址
    #[arg(long)]
    address: Option<String>,

    /// 患者纬度
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// 患者经度
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// 模拟数据源的随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 输出默认配置(TOML)后退出
    #[arg(long)]
    print_config: bool,

    /// 输出智能体工具声明(JSON)后退出
    #[arg(long)]
    tools: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", AssistConfig::default().to_toml()?);
        return Ok(());
    }
    if args.tools {
        println!("{}", serde_json::to_string_pretty(&tool_declarations())?);
        return Ok(());
    }

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }

    // 初始化日志
    init_tracing(&config.logging, args.log_level.as_deref())?;

    info!("启动急救助手...");
    info!("  配置文件: {}", manager.config_path().unwrap_or("(内置默认值)"));
    info!("  预选医院: {}", config.hospitals.len());
    info!("  紧急联系人: {}", config.contacts.len());
    info!("  查询超时: {:?}", config.selection.lookup_timeout());

    let patient = patient_from_args(&config, &args)?;
    let orchestrator = build_orchestrator(&config)?;

    let report = match &args.description {
        Some(description) => orchestrator.respond_to(&patient, description).await,
        None => orchestrator.execute_protocol(&patient).await,
    };
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            error!("急救流程执行失败: {}", e);
            return Err(e.into());
        }
    };

    match &report.outcome {
        ProtocolOutcome::NoEmergencyDetected => info!("未检测到紧急情况"),
        ProtocolOutcome::CriticalEscalation { triage, .. } => {
            warn!("危重情况: {}，已直接联系急救并通知联系人", triage.summary)
        }
        ProtocolOutcome::HospitalAlerted {
            hospital,
            alert_delivered,
            ..
        } => info!(
            "已选择医院: {} ({})，告警{}",
            hospital.name,
            hospital.address,
            if *alert_delivered { "已送达" } else { "未送达" }
        ),
        ProtocolOutcome::NoAvailableHospital { .. } => error!("没有可用医院，已通知联系人"),
    }
    info!(
        "事件 {} 结束，状态 {:?}，通知联系人 {}/{}",
        report.incident.id,
        report.incident.status,
        report.outcome.contacts_notified(),
        report.outcome.notifications().len()
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn patient_from_args(config: &AssistConfig, args: &Args) -> Result<PatientContext> {
    let mut patient = config.patient.clone();
    if let Some(address) = &args.address {
        patient.address = address.clone();
    }
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        patient.coordinates = Coordinates::new(lat, lon).context("Invalid patient coordinates")?;
    }
    Ok(patient)
}

/// 根据配置组装模拟数据源和编排器
fn build_orchestrator(config: &AssistConfig) -> Result<EmergencyOrchestrator> {
    let sim = &config.simulation;
    // 每个数据源的种子互不相同
    let seed_for = |offset: u64| sim.seed.map(|seed| seed.wrapping_add(offset));

    let availability = SimulatedAvailabilitySource::new(
        sim.available_probability,
        sim.min_wait_minutes,
        sim.max_wait_minutes,
        seed_for(0),
    )?;
    let traffic = SimulatedTrafficSource::new(sim.min_minutes_per_km, sim.max_minutes_per_km, seed_for(1))?;

    let voice = match &sim.voice_phrase {
        Some(phrase) => FixedVoiceInput::new(phrase.clone()),
        None => FixedVoiceInput::silent(),
    };
    let sensor = RandomTriggerSensor::new(sim.trigger_probability, seed_for(2))?;

    let selector = HospitalSelector::new(Arc::new(availability), Arc::new(traffic))
        .with_weights(ScoringWeights {
            travel: config.selection.travel_weight,
            wait: config.selection.wait_weight,
        })
        .with_lookup_timeout(config.selection.lookup_timeout());

    let protocol = ProtocolConfig::new(config.hospitals.clone(), config.contacts.clone())
        .with_message_template(config.message_template.clone());

    Ok(EmergencyOrchestrator::new(
        protocol,
        EmergencyDetector::new(Arc::new(voice), Arc::new(sensor)),
        selector,
        Arc::new(LoggingAlertSink),
        Arc::new(LoggingContactNotifier),
    ))
}
