//! 核心数据模型定义

use crate::error::{AssistError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 地理坐标
///
/// 构造和反序列化时都会校验经纬度范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = AssistError;

    fn try_from(raw: RawCoordinates) -> Result<Self> {
        Coordinates::new(raw.lat, raw.lon)
    }
}

impl Coordinates {
    /// 创建经过校验的坐标
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AssistError::Validation(format!(
                "latitude {} out of range [-90, 90]",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(AssistError::Validation(format!(
                "longitude {} out of range [-180, 180]",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// 预选医院
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub address: String,
    pub contact_number: String,
    pub coordinates: Coordinates,
}

/// 紧急联系人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

/// 病史
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
}

/// 患者基本资料，供智能体工具和告警使用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub blood_type: Option<String>,
}

/// 单次事件中的患者上下文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub address: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub profile: PatientProfile,
}

impl PatientContext {
    pub fn new(address: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            address: address.into(),
            coordinates,
            medical_history: MedicalHistory::default(),
            profile: PatientProfile::default(),
        }
    }

    pub fn with_medical_history(mut self, medical_history: MedicalHistory) -> Self {
        self.medical_history = medical_history;
        self
    }

    pub fn with_profile(mut self, profile: PatientProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// 医院可用性报告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub wait_time_minutes: u32,
}

/// 交通分析报告
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficReport {
    pub travel_time_minutes: u32,
    pub distance_km: f64,
}

/// 参与排名的候选医院
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub hospital: Hospital,
    pub travel_time_minutes: u32,
    pub wait_time_minutes: u32,
    pub distance_km: f64,
    pub score: f64,
}

/// 症状严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical, // 危重
    Moderate, // 中等
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Moderate => "moderate",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分诊结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub summary: String,
    pub severity: Severity,
}

impl TriageResult {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// 默认告警消息模板
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Emergency: Immediate medical assistance required. \
Patient at {patient_address}. Symptoms: {symptoms_summary}. \
Medical History: {medical_history_summary}. \
Please confirm availability and estimated time of arrival. This is an urgent request.";

/// 发送给医院的告警内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub patient_address: String,
    pub symptoms_summary: String,
    pub medical_history_summary: String,
}

impl AlertPayload {
    /// 根据患者上下文和分诊摘要构建告警，病史以JSON形式附带
    pub fn new(patient: &PatientContext, symptoms_summary: &str) -> Result<Self> {
        Ok(Self {
            patient_address: patient.address.clone(),
            symptoms_summary: symptoms_summary.to_string(),
            medical_history_summary: serde_json::to_string(&patient.medical_history)?,
        })
    }

    /// 按模板渲染告警消息
    ///
    /// 模板只扫描一遍，插入的值原样输出，不会再次展开其中的占位符；
    /// 未知的占位符保留原文
    pub fn render(&self, template: &str) -> String {
        let fields = [
            ("{patient_address}", self.patient_address.as_str()),
            ("{symptoms_summary}", self.symptoms_summary.as_str()),
            ("{medical_history_summary}", self.medical_history_summary.as_str()),
        ];

        let mut message = String::with_capacity(template.len() + 128);
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            message.push_str(&rest[..start]);
            rest = &rest[start..];

            match fields.iter().find(|(placeholder, _)| rest.starts_with(placeholder)) {
                Some((placeholder, value)) => {
                    message.push_str(value);
                    rest = &rest[placeholder.len()..];
                }
                None => {
                    message.push('{');
                    rest = &rest[1..];
                }
            }
        }
        message.push_str(rest);
        message
    }
}

/// 通知紧急联系人的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactNotice {
    /// 危重情况，直接联系急救
    CriticalCondition { symptoms_summary: String },
    /// 已选定医院，`alert_delivered` 表示告警是否送达
    HospitalAlerted {
        hospital_name: String,
        hospital_address: String,
        hospital_phone: String,
        alert_delivered: bool,
    },
    /// 没有找到可用医院
    NoHospitalAvailable { symptoms_summary: String },
}

impl ContactNotice {
    pub fn message(&self) -> String {
        match self {
            Self::CriticalCondition { symptoms_summary } => format!(
                "Critical condition reported ({}). Emergency services are being contacted directly.",
                symptoms_summary
            ),
            Self::HospitalAlerted {
                hospital_name,
                hospital_address,
                alert_delivered: true,
                ..
            } => format!(
                "{} ({}) has been alerted and is expecting the patient.",
                hospital_name, hospital_address
            ),
            Self::HospitalAlerted {
                hospital_name,
                hospital_address,
                hospital_phone,
                alert_delivered: false,
            } => format!(
                "{} ({}) was selected but the alert could not be confirmed. Please call {}.",
                hospital_name, hospital_address, hospital_phone
            ),
            Self::NoHospitalAvailable { symptoms_summary } => format!(
                "No hospital is currently available for the reported condition ({}). Please assist immediately.",
                symptoms_summary
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(34.05, -118.24).is_ok());
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinates_deserialize_rejects_out_of_range() {
        let ok: std::result::Result<Coordinates, _> =
            serde_json::from_str(r#"{"lat": 34.0522, "lon": -118.2437}"#);
        assert!(ok.is_ok());

        let bad: std::result::Result<Coordinates, _> =
            serde_json::from_str(r#"{"lat": 134.0, "lon": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_alert_payload_render() {
        let patient = PatientContext::new(
            "123 Main St, Apt 4B",
            Coordinates::new(34.055, -118.245).unwrap(),
        )
        .with_medical_history(MedicalHistory {
            allergies: vec!["Penicillin".to_string()],
            conditions: vec!["Asthma".to_string()],
            medications: vec!["Inhaler".to_string()],
        });

        let payload = AlertPayload::new(&patient, "Difficulty breathing").unwrap();
        assert!(payload.medical_history_summary.contains("Penicillin"));

        let message = payload.render("At {patient_address}: {symptoms_summary}. {medical_history_summary}");
        assert!(message.starts_with("At 123 Main St, Apt 4B: Difficulty breathing."));
        assert!(message.contains("\"allergies\":[\"Penicillin\"]"));
    }

    #[test]
    fn test_alert_payload_render_keeps_values_verbatim() {
        let patient = PatientContext::new("Flat {symptoms_summary}", Coordinates::new(34.055, -118.245).unwrap());
        let payload = AlertPayload::new(&patient, "typed {medical_history_summary} here").unwrap();

        let message = payload.render("Patient at {patient_address}. Symptoms: {symptoms_summary}. {unknown}");
        assert_eq!(
            message,
            "Patient at Flat {symptoms_summary}. Symptoms: typed {medical_history_summary} here. {unknown}"
        );
        assert!(!message.contains("allergies"));
    }

    #[test]
    fn test_contact_notice_mentions_phone_when_alert_failed() {
        let notice = ContactNotice::HospitalAlerted {
            hospital_name: "City General Hospital".to_string(),
            hospital_address: "123 Main St, Anytown".to_string(),
            hospital_phone: "+11234567890".to_string(),
            alert_delivered: false,
        };
        assert!(notice.message().contains("+11234567890"));

        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "hospital_alerted");
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(Severity::Moderate.to_string(), "moderate");
    }
}
