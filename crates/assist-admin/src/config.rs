//! 配置管理
//!
//! 加载、验证和导出急救助手的配置。配置文件可选，缺失的字段使用内置默认值，
//! 环境变量 `ASSIST_*` 覆盖文件中的值（嵌套字段用 `__` 分隔）。

use anyhow::{Context, Result};
use assist_core::{
    Coordinates, EmergencyContact, Hospital, MedicalHistory, PatientContext, DEFAULT_MESSAGE_TEMPLATE,
};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<AssistConfig>>,
    /// 配置文件路径，未指定时只使用默认值和环境变量
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 急救助手完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// 预选医院
    pub hospitals: Vec<Hospital>,
    /// 紧急联系人
    pub contacts: Vec<EmergencyContact>,
    /// 医院告警模板
    pub message_template: String,
    /// 默认患者信息
    pub patient: PatientContext,
    /// 医院选择配置
    pub selection: SelectionConfig,
    /// 模拟数据源配置
    pub simulation: SimulationConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 医院选择配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// 单次查询超时（毫秒）
    pub lookup_timeout_ms: u64,
    /// 交通时间权重
    pub travel_weight: f64,
    /// 候诊时间权重
    pub wait_weight: f64,
}

impl SelectionConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

/// 模拟数据源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 医院可接收的概率
    pub available_probability: f64,
    pub min_wait_minutes: u32,
    pub max_wait_minutes: u32,
    /// 每公里行驶分钟数范围
    pub min_minutes_per_km: f64,
    pub max_minutes_per_km: f64,
    /// 自动触发概率
    pub trigger_probability: f64,
    /// 模拟语音指令，未设置时没有语音输入
    pub voice_phrase: Option<String>,
    /// 随机种子，未设置时使用系统熵
    pub seed: Option<u64>,
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别，EnvFilter 语法
    pub level: String,
    /// 日志格式
    pub format: LogFormat,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&AssistConfig) -> Result<()>,
}

impl ConfigManager {
    /// 创建新的配置管理器，加载后立即验证
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从文件和环境变量加载配置
    fn load_config(config_path: Option<&str>) -> Result<AssistConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("ASSIST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration sources")?;

        let config: AssistConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 解析TOML文本，不读取环境变量
    pub fn parse_toml(content: &str) -> Result<AssistConfig> {
        let settings = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .context("Failed to parse configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// 获取配置
    pub async fn get_config(&self) -> AssistConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 重新加载配置，验证失败时保留旧配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded");
        Ok(())
    }

    /// 按点分路径获取配置值，例如 `selection.lookup_timeout_ms`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let value = extract_nested_value(&config, path)
            .with_context(|| format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value).context("Failed to deserialize configuration value")
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }
}

fn extract_nested_value(config: &AssistConfig, path: &str) -> Result<serde_json::Value> {
    let config_json = serde_json::to_value(config).context("Failed to serialize config to JSON")?;

    let mut current = &config_json;
    for part in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map
                .get(part)
                .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?,
            serde_json::Value::Array(items) => part
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .ok_or_else(|| anyhow::anyhow!("Invalid array index: {}", part))?,
            _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
        };
    }

    Ok(current.clone())
}

impl AssistConfig {
    /// 导出为TOML，用于生成示例配置文件
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

fn probability_in_range(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow::anyhow!("{} {} must be within [0, 1]", name, value));
    }
    Ok(())
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "hospitals",
                validator: |config| {
                    let mut seen = HashSet::new();
                    for hospital in &config.hospitals {
                        if hospital.id.trim().is_empty() {
                            return Err(anyhow::anyhow!("hospital id cannot be empty"));
                        }
                        if !seen.insert(hospital.id.as_str()) {
                            return Err(anyhow::anyhow!("duplicate hospital id: {}", hospital.id));
                        }
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "contacts",
                validator: |config| {
                    if config.contacts.is_empty() {
                        return Err(anyhow::anyhow!("at least one emergency contact is required"));
                    }
                    if let Some(contact) = config.contacts.iter().find(|c| c.phone.trim().is_empty()) {
                        return Err(anyhow::anyhow!("contact {} has no phone number", contact.name));
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "selection.lookup_timeout_ms",
                validator: |config| {
                    if config.selection.lookup_timeout_ms == 0 {
                        Err(anyhow::anyhow!("lookup timeout must be positive"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "selection.weights",
                validator: |config| {
                    let SelectionConfig { travel_weight, wait_weight, .. } = config.selection;
                    if !travel_weight.is_finite() || !wait_weight.is_finite() {
                        return Err(anyhow::anyhow!("weights must be finite"));
                    }
                    if travel_weight < 0.0 || wait_weight < 0.0 {
                        return Err(anyhow::anyhow!(
                            "weights cannot be negative (travel {}, wait {})",
                            travel_weight,
                            wait_weight
                        ));
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "simulation",
                validator: |config| {
                    let sim = &config.simulation;
                    probability_in_range("available_probability", sim.available_probability)?;
                    probability_in_range("trigger_probability", sim.trigger_probability)?;
                    if sim.min_wait_minutes > sim.max_wait_minutes {
                        return Err(anyhow::anyhow!(
                            "min_wait_minutes {} exceeds max_wait_minutes {}",
                            sim.min_wait_minutes,
                            sim.max_wait_minutes
                        ));
                    }
                    // 与 SimulatedTrafficSource::new 的约束一致：0 < min <= max，且都为有限值
                    if !(sim.min_minutes_per_km > 0.0
                        && sim.max_minutes_per_km.is_finite()
                        && sim.min_minutes_per_km <= sim.max_minutes_per_km)
                    {
                        return Err(anyhow::anyhow!(
                            "minutes per km range [{}, {}] is invalid",
                            sim.min_minutes_per_km,
                            sim.max_minutes_per_km
                        ));
                    }
                    Ok(())
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &AssistConfig) -> Result<()> {
        for rule in &self.validation_rules {
            debug!("Validating {}", rule.field_path);
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn default_hospitals() -> Vec<Hospital> {
    let hospital = |id: &str, name: &str, address: &str, phone: &str, lat: f64, lon: f64| Hospital {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        contact_number: phone.to_string(),
        coordinates: Coordinates::new(lat, lon).unwrap_or_else(|_| unreachable!("literal coordinates")),
    };

    vec![
        hospital(
            "hosp_a",
            "City General Hospital",
            "123 Main St, Anytown",
            "+11234567890",
            34.0522,
            -118.2437,
        ),
        hospital(
            "hosp_b",
            "Community Care Center",
            "456 Oak Ave, Anytown",
            "+11234567891",
            34.0600,
            -118.2500,
        ),
    ]
}

impl Default for AssistConfig {
    fn default() -> Self {
        let patient_coordinates =
            Coordinates::new(34.0550, -118.2450).unwrap_or_else(|_| unreachable!("literal coordinates"));

        Self {
            hospitals: default_hospitals(),
            contacts: vec![
                EmergencyContact {
                    name: "Family Member".to_string(),
                    phone: "+19876543210".to_string(),
                },
                EmergencyContact {
                    name: "Close Friend".to_string(),
                    phone: "+19998887777".to_string(),
                },
            ],
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            patient: PatientContext::new("123 Main St, Apt 4B", patient_coordinates).with_medical_history(
                MedicalHistory {
                    allergies: vec!["Penicillin".to_string()],
                    conditions: vec!["Asthma".to_string()],
                    medications: vec!["Inhaler".to_string()],
                },
            ),
            selection: SelectionConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 5_000,
            travel_weight: 0.7,
            wait_weight: 0.3,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            available_probability: 0.8,
            min_wait_minutes: 5,
            max_wait_minutes: 60,
            min_minutes_per_km: 2.0,
            max_minutes_per_km: 5.0,
            trigger_probability: 0.1,
            voice_phrase: Some("I feel a sharp pain in my chest and my arm is numb.".to_string()),
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
