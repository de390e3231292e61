//! 智能体工具集
//!
//! 以函数调用工具的形式暴露急救流程的各个步骤，供外部大模型智能体调用。
//! 医院排名仍由确定性的选择器给出，模型只负责按顺序调用工具。

use crate::{
    notification::{notify_all, AlertSink, ContactNotifier},
    orchestrator::{dispatch_alert, ProtocolConfig},
    selection::{HospitalSelector, IntakeStatus},
};
use assist_core::{AssistError, ContactNotice, Hospital, PatientContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// 工具名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetUserLocation,
    AnalyzeHospitals,
    SendAlertToHospital,
    NotifyEmergencyContacts,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        Self::GetUserLocation,
        Self::AnalyzeHospitals,
        Self::SendAlertToHospital,
        Self::NotifyEmergencyContacts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetUserLocation => "get_user_location",
            Self::AnalyzeHospitals => "analyze_traffic_and_hospital_availability",
            Self::SendAlertToHospital => "send_alert_to_hospital",
            Self::NotifyEmergencyContacts => "notify_emergency_contacts",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::GetUserLocation => "Get the user's current address, coordinates and medical information.",
            Self::AnalyzeHospitals => {
                "Check availability and travel time for every pre-selected hospital. \
                 Hospitals marked 'Diverting' or 'Unreachable' must not be used."
            }
            Self::SendAlertToHospital => "Send the emergency alert with the user's details to one hospital.",
            Self::NotifyEmergencyContacts => "Notify every configured emergency contact.",
        }
    }

    fn parameters(&self) -> Value {
        match self {
            Self::GetUserLocation | Self::AnalyzeHospitals => json!({
                "type": "object",
                "properties": {},
            }),
            Self::SendAlertToHospital => json!({
                "type": "object",
                "properties": {
                    "hospital_id": { "type": "string", "description": "Id of the hospital to alert." },
                    "symptoms_summary": { "type": "string", "description": "Short description of the symptoms." },
                },
                "required": ["hospital_id"],
            }),
            Self::NotifyEmergencyContacts => json!({
                "type": "object",
                "properties": {
                    "hospital_id": { "type": "string", "description": "Hospital that was selected, if any." },
                    "alert_delivered": {
                        "type": "boolean",
                        "description": "Whether send_alert_to_hospital reported the alert as delivered.",
                    },
                    "critical": { "type": "boolean", "description": "Whether the condition is critical." },
                    "symptoms_summary": { "type": "string" },
                },
            }),
        }
    }

    /// 函数声明，格式为 name / description / JSON Schema parameters
    pub fn declaration(&self) -> Value {
        json!({
            "name": self.as_str(),
            "description": self.description(),
            "parameters": self.parameters(),
        })
    }
}

impl TryFrom<&str> for ToolName {
    type Error = AssistError;

    fn try_from(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == value)
            .ok_or_else(|| AssistError::UnknownTool(value.to_string()))
    }
}

/// 所有工具的声明
pub fn tool_declarations() -> Value {
    Value::Array(ToolName::ALL.iter().map(ToolName::declaration).collect())
}

/// 一次工具调用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendAlertArgs {
    hospital_id: String,
    #[serde(default)]
    symptoms_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifyContactsArgs {
    #[serde(default)]
    hospital_id: Option<String>,
    #[serde(default)]
    alert_delivered: bool,
    #[serde(default)]
    critical: bool,
    #[serde(default)]
    symptoms_summary: Option<String>,
}

fn parse_args<T: for<'de> Deserialize<'de> + Default>(args: &Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(args.clone())?)
}

/// 智能体工具集，绑定单个患者
pub struct EmergencyToolkit {
    config: Arc<ProtocolConfig>,
    patient: PatientContext,
    selector: HospitalSelector,
    alert_sink: Arc<dyn AlertSink>,
    notifier: Arc<dyn ContactNotifier>,
}

impl EmergencyToolkit {
    pub(crate) fn new(
        config: Arc<ProtocolConfig>,
        patient: PatientContext,
        selector: HospitalSelector,
        alert_sink: Arc<dyn AlertSink>,
        notifier: Arc<dyn ContactNotifier>,
    ) -> Self {
        Self {
            config,
            patient,
            selector,
            alert_sink,
            notifier,
        }
    }

    /// 分发工具调用，返回JSON结果
    pub async fn dispatch(&self, call: &ToolCall) -> Result<Value> {
        let tool = ToolName::try_from(call.name.as_str())?;
        tracing::info!("Agent tool call: {}", tool.as_str());

        match tool {
            ToolName::GetUserLocation => self.get_user_location(),
            ToolName::AnalyzeHospitals => self.analyze_hospitals().await,
            ToolName::SendAlertToHospital => {
                let args: SendAlertArgs = serde_json::from_value(call.args.clone())?;
                self.send_alert(args).await
            }
            ToolName::NotifyEmergencyContacts => {
                let args: NotifyContactsArgs = parse_args(&call.args)?;
                self.notify_contacts(args).await
            }
        }
    }

    fn get_user_location(&self) -> Result<Value> {
        Ok(json!({
            "address": self.patient.address,
            "lat": self.patient.coordinates.lat(),
            "lon": self.patient.coordinates.lon(),
            "profile": self.patient.profile,
            "medical_history": self.patient.medical_history,
        }))
    }

    async fn analyze_hospitals(&self) -> Result<Value> {
        let assessments = self.selector.assess(&self.patient, &self.config.hospitals).await;
        let recommended = self
            .selector
            .rank_assessments(&assessments)
            .into_iter()
            .next()
            .map(|candidate| candidate.hospital.id);

        let hospitals: Vec<Value> = assessments
            .iter()
            .map(|assessment| {
                json!({
                    "hospital_id": assessment.hospital.id,
                    "name": assessment.hospital.name,
                    "status": intake_label(&assessment.status),
                    "wait_time_minutes": assessment.availability.map(|a| a.wait_time_minutes),
                    "travel_time_minutes": assessment.traffic.map(|t| t.travel_time_minutes),
                    "distance_km": assessment.traffic.map(|t| t.distance_km),
                    "error": assessment.error,
                })
            })
            .collect();

        Ok(json!({
            "hospitals": hospitals,
            "recommended_hospital_id": recommended,
        }))
    }

    async fn send_alert(&self, args: SendAlertArgs) -> Result<Value> {
        let hospital = self.find_hospital(&args.hospital_id)?;
        let summary = args.symptoms_summary.unwrap_or_else(|| "Unspecified emergency".to_string());

        let delivered = dispatch_alert(
            self.alert_sink.as_ref(),
            &self.config.message_template,
            hospital,
            &self.patient,
            &summary,
        )
        .await;

        Ok(json!({
            "hospital_id": hospital.id,
            "delivered": delivered,
        }))
    }

    async fn notify_contacts(&self, args: NotifyContactsArgs) -> Result<Value> {
        let summary = args.symptoms_summary.unwrap_or_else(|| "Unspecified emergency".to_string());
        let notice = match (&args.hospital_id, args.critical) {
            (_, true) => ContactNotice::CriticalCondition { symptoms_summary: summary },
            (Some(hospital_id), false) => {
                let hospital = self.find_hospital(hospital_id)?;
                ContactNotice::HospitalAlerted {
                    hospital_name: hospital.name.clone(),
                    hospital_address: hospital.address.clone(),
                    hospital_phone: hospital.contact_number.clone(),
                    alert_delivered: args.alert_delivered,
                }
            }
            (None, false) => ContactNotice::NoHospitalAvailable { symptoms_summary: summary },
        };

        let records = notify_all(self.notifier.as_ref(), &self.config.contacts, &notice).await;
        let notified: Vec<&str> = records
            .iter()
            .filter(|r| r.is_sent())
            .map(|r| r.contact.name.as_str())
            .collect();

        Ok(json!({
            "notified": notified,
            "failed": records.len() - notified.len(),
        }))
    }

    fn find_hospital(&self, hospital_id: &str) -> Result<&Hospital> {
        self.config
            .hospitals
            .iter()
            .find(|h| h.id == hospital_id)
            .ok_or_else(|| AssistError::Validation(format!("unknown hospital id: {}", hospital_id)))
    }
}

fn intake_label(status: &IntakeStatus) -> &'static str {
    match status {
        IntakeStatus::Accepting => "Accepting",
        IntakeStatus::Diverting => "Diverting",
        IntakeStatus::Unreachable => "Unreachable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{EmergencyDetector, FixedVoiceInput, RandomTriggerSensor};
    use crate::notification::{LoggingAlertSink, LoggingContactNotifier};
    use crate::orchestrator::EmergencyOrchestrator;
    use crate::sources::{StaticAvailabilitySource, StaticTrafficSource};
    use assist_core::{AvailabilityReport, Coordinates, EmergencyContact, TrafficReport};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<ContactNotice>>,
    }

    #[async_trait]
    impl ContactNotifier for RecordingNotifier {
        async fn notify(&self, _contact: &EmergencyContact, notice: &ContactNotice) -> Result<()> {
            self.notices.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    fn toolkit() -> EmergencyToolkit {
        toolkit_with(Arc::new(LoggingContactNotifier))
    }

    fn toolkit_with(notifier: Arc<dyn ContactNotifier>) -> EmergencyToolkit {
        let a = Hospital {
            id: "hosp_a".to_string(),
            name: "City General Hospital".to_string(),
            address: "123 Main St, Anytown".to_string(),
            contact_number: "+11234567890".to_string(),
            coordinates: Coordinates::new(34.0522, -118.2437).unwrap(),
        };
        let b = Hospital {
            id: "hosp_b".to_string(),
            name: "Community Care Center".to_string(),
            address: "456 Oak Ave, Anytown".to_string(),
            contact_number: "+11234567891".to_string(),
            coordinates: Coordinates::new(34.0600, -118.2500).unwrap(),
        };

        let selector = HospitalSelector::new(
            Arc::new(
                StaticAvailabilitySource::new()
                    .with_report("hosp_a", AvailabilityReport { available: true, wait_time_minutes: 15 })
                    .with_report("hosp_b", AvailabilityReport { available: false, wait_time_minutes: 5 }),
            ),
            Arc::new(
                StaticTrafficSource::new()
                    .with_report(a.coordinates, TrafficReport { travel_time_minutes: 3, distance_km: 0.35 })
                    .with_report(b.coordinates, TrafficReport { travel_time_minutes: 2, distance_km: 0.72 }),
            ),
        );
        let detector = EmergencyDetector::new(
            Arc::new(FixedVoiceInput::silent()),
            Arc::new(RandomTriggerSensor::new(0.0, None).unwrap()),
        );
        let orchestrator = EmergencyOrchestrator::new(
            ProtocolConfig::new(
                vec![a, b],
                vec![EmergencyContact { name: "Family Member".to_string(), phone: "+19876543210".to_string() }],
            ),
            detector,
            selector,
            Arc::new(LoggingAlertSink),
            notifier,
        );

        orchestrator.toolkit(PatientContext::new(
            "123 Main St, Apt 4B",
            Coordinates::new(34.0550, -118.2450).unwrap(),
        ))
    }

    #[test]
    fn test_tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::try_from(tool.as_str()).unwrap(), tool);
        }
        assert!(matches!(ToolName::try_from("book_taxi"), Err(AssistError::UnknownTool(_))));
    }

    #[test]
    fn test_declarations_list_every_tool() {
        let declarations = tool_declarations();
        let names: Vec<&str> = declarations
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "get_user_location",
                "analyze_traffic_and_hospital_availability",
                "send_alert_to_hospital",
                "notify_emergency_contacts"
            ]
        );
    }

    #[tokio::test]
    async fn test_analyze_marks_diverting_and_recommends() {
        let toolkit = toolkit();
        let result = toolkit
            .dispatch(&ToolCall::new("analyze_traffic_and_hospital_availability", Value::Null))
            .await
            .unwrap();

        assert_eq!(result["hospitals"][0]["status"], "Accepting");
        assert_eq!(result["hospitals"][1]["status"], "Diverting");
        assert_eq!(result["recommended_hospital_id"], "hosp_a");
    }

    #[tokio::test]
    async fn test_location_and_alert_tools() {
        let toolkit = toolkit();

        let location = toolkit.dispatch(&ToolCall::new("get_user_location", json!({}))).await.unwrap();
        assert_eq!(location["address"], "123 Main St, Apt 4B");

        let alert = toolkit
            .dispatch(&ToolCall::new("send_alert_to_hospital", json!({ "hospital_id": "hosp_a" })))
            .await
            .unwrap();
        assert_eq!(alert["delivered"], true);

        let unknown = toolkit
            .dispatch(&ToolCall::new("send_alert_to_hospital", json!({ "hospital_id": "hosp_z" })))
            .await;
        assert!(matches!(unknown, Err(AssistError::Validation(_))));

        let missing_args = toolkit.dispatch(&ToolCall::new("send_alert_to_hospital", json!({}))).await;
        assert!(matches!(missing_args, Err(AssistError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_notify_tool_reports_contacts() {
        let toolkit = toolkit();
        let result = toolkit
            .dispatch(&ToolCall::new("notify_emergency_contacts", json!({ "hospital_id": "hosp_a" })))
            .await
            .unwrap();

        assert_eq!(result["notified"], json!(["Family Member"]));
        assert_eq!(result["failed"], 0);
    }

    #[tokio::test]
    async fn test_notify_tool_only_reports_delivery_when_told() {
        let notifier = Arc::new(RecordingNotifier::default());
        let toolkit = toolkit_with(notifier.clone());

        toolkit
            .dispatch(&ToolCall::new("notify_emergency_contacts", json!({ "hospital_id": "hosp_a" })))
            .await
            .unwrap();
        toolkit
            .dispatch(&ToolCall::new(
                "notify_emergency_contacts",
                json!({ "hospital_id": "hosp_a", "alert_delivered": true }),
            ))
            .await
            .unwrap();

        let notices = notifier.notices.lock().unwrap();
        assert!(matches!(
            &notices[0],
            ContactNotice::HospitalAlerted { alert_delivered: false, hospital_phone, .. }
                if hospital_phone == "+11234567890"
        ));
        assert!(notices[0].message().contains("+11234567890"));
        assert!(matches!(&notices[1], ContactNotice::HospitalAlerted { alert_delivered: true, .. }));
    }
}
