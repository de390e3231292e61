//! 紧急情况检测
//!
//! 语音输入和自动触发器任意一个有信号即视为紧急情况

use assist_core::{AssistError, Result};
use async_trait::async_trait;
use crate::sources::seeded_rng;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, Mutex};

/// 默认的模拟语音指令
pub const DEFAULT_VOICE_PHRASE: &str = "I feel a sharp pain in my chest and my arm is numb.";

/// 语音输入接口
#[async_trait]
pub trait VoiceInput: Send + Sync {
    /// 获取一条语音指令，没有输入时返回 `None`
    async fn listen(&self) -> Result<Option<String>>;
}

/// 自动触发器接口（传感器、跌倒检测等）
#[async_trait]
pub trait TriggerSensor: Send + Sync {
    async fn detect(&self) -> Result<bool>;
}

/// 返回固定语句的语音输入
#[derive(Debug, Clone)]
pub struct FixedVoiceInput {
    phrase: Option<String>,
}

impl FixedVoiceInput {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: Some(phrase.into()),
        }
    }

    /// 始终没有语音输入
    pub fn silent() -> Self {
        Self { phrase: None }
    }
}

impl Default for FixedVoiceInput {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE_PHRASE)
    }
}

#[async_trait]
impl VoiceInput for FixedVoiceInput {
    async fn listen(&self) -> Result<Option<String>> {
        tracing::info!("Listening for voice command...");
        Ok(self.phrase.clone().filter(|phrase| !phrase.trim().is_empty()))
    }
}

/// 按概率触发的模拟传感器
#[derive(Debug)]
pub struct RandomTriggerSensor {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl RandomTriggerSensor {
    pub const DEFAULT_PROBABILITY: f64 = 0.1;

    pub fn new(probability: f64, seed: Option<u64>) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(AssistError::Validation(format!(
                "trigger probability {} must be within [0, 1]",
                probability
            )));
        }

        Ok(Self {
            probability,
            rng: Mutex::new(seeded_rng(seed)),
        })
    }
}

#[async_trait]
impl TriggerSensor for RandomTriggerSensor {
    async fn detect(&self) -> Result<bool> {
        tracing::info!("Checking emergency triggers...");
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AssistError::Detection("trigger rng lock poisoned".to_string()))?;
        Ok(rng.gen_bool(self.probability))
    }
}

/// 检测信号
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionSignal {
    pub voice_input: Option<String>,
    pub auto_triggered: bool,
}

impl DetectionSignal {
    pub fn is_emergency(&self) -> bool {
        self.voice_input.is_some() || self.auto_triggered
    }

    /// 用于分诊的描述，只有自动触发时为空串
    pub fn description(&self) -> &str {
        self.voice_input.as_deref().unwrap_or("")
    }
}

/// 紧急情况检测器
#[derive(Clone)]
pub struct EmergencyDetector {
    voice: Arc<dyn VoiceInput>,
    sensor: Arc<dyn TriggerSensor>,
}

impl std::fmt::Debug for EmergencyDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyDetector").finish_non_exhaustive()
    }
}

impl EmergencyDetector {
    pub fn new(voice: Arc<dyn VoiceInput>, sensor: Arc<dyn TriggerSensor>) -> Self {
        Self { voice, sensor }
    }

    /// 采集两路信号，任一路失败都按无信号处理
    pub async fn detect(&self) -> DetectionSignal {
        let voice_input = match self.voice.listen().await {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!("Voice input unavailable: {}", e);
                None
            }
        };

        let auto_triggered = match self.sensor.detect().await {
            Ok(triggered) => triggered,
            Err(e) => {
                tracing::warn!("Trigger sensor unavailable: {}", e);
                false
            }
        };

        DetectionSignal {
            voice_input,
            auto_triggered,
        }
    }
}
