//! 急救流程编排
//!
//! 协调检测、分诊、医院选择、告警和联系人通知的核心引擎

use crate::{
    agent::EmergencyToolkit,
    detection::EmergencyDetector,
    incident::{IncidentEvent, IncidentRecord, IncidentStateMachine},
    notification::{notify_all, AlertSink, ContactNotifier, NotificationRecord, DEFAULT_MESSAGE_TEMPLATE},
    selection::HospitalSelector,
    triage::SymptomTriage,
};
use assist_core::{
    AlertPayload, ContactNotice, EmergencyContact, Hospital, PatientContext, Result, TriageResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 流程配置：预选医院、紧急联系人和告警模板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub hospitals: Vec<Hospital>,
    pub contacts: Vec<EmergencyContact>,
    pub message_template: String,
}

impl ProtocolConfig {
    pub fn new(hospitals: Vec<Hospital>, contacts: Vec<EmergencyContact>) -> Self {
        Self {
            hospitals,
            contacts,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }

    pub fn with_message_template(mut self, message_template: impl Into<String>) -> Self {
        self.message_template = message_template.into();
        self
    }
}

/// 流程结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProtocolOutcome {
    /// 未检测到紧急情况，流程直接结束
    NoEmergencyDetected,
    /// 危重情况，跳过医院选择直接通知联系人
    CriticalEscalation {
        triage: TriageResult,
        notifications: Vec<NotificationRecord>,
    },
    /// 已选定医院并发出告警
    HospitalAlerted {
        triage: TriageResult,
        hospital: Hospital,
        alert_delivered: bool,
        notifications: Vec<NotificationRecord>,
    },
    /// 没有可用医院，仍然通知联系人
    NoAvailableHospital {
        triage: TriageResult,
        notifications: Vec<NotificationRecord>,
    },
}

impl ProtocolOutcome {
    pub fn triage(&self) -> Option<&TriageResult> {
        match self {
            Self::NoEmergencyDetected => None,
            Self::CriticalEscalation { triage, .. }
            | Self::HospitalAlerted { triage, .. }
            | Self::NoAvailableHospital { triage, .. } => Some(triage),
        }
    }

    pub fn notifications(&self) -> &[NotificationRecord] {
        match self {
            Self::NoEmergencyDetected => &[],
            Self::CriticalEscalation { notifications, .. }
            | Self::HospitalAlerted { notifications, .. }
            | Self::NoAvailableHospital { notifications, .. } => notifications,
        }
    }

    /// 成功送达的联系人数量
    pub fn contacts_notified(&self) -> usize {
        self.notifications().iter().filter(|n| n.is_sent()).count()
    }
}

/// 单次流程的执行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolReport {
    pub incident: IncidentRecord,
    pub outcome: ProtocolOutcome,
}

/// 急救流程编排器
///
/// 参考数据只读共享，每次执行的中间结果都是局部的，可以并发处理多个事件
pub struct EmergencyOrchestrator {
    config: Arc<ProtocolConfig>,
    triage: SymptomTriage,
    detector: EmergencyDetector,
    selector: HospitalSelector,
    alert_sink: Arc<dyn AlertSink>,
    notifier: Arc<dyn ContactNotifier>,
    state_machine: IncidentStateMachine,
}

impl std::fmt::Debug for EmergencyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyOrchestrator")
            .field("hospitals", &self.config.hospitals.len())
            .field("contacts", &self.config.contacts.len())
            .field("selector", &self.selector)
            .finish()
    }
}

impl EmergencyOrchestrator {
    /// 创建新的编排器
    pub fn new(
        config: ProtocolConfig,
        detector: EmergencyDetector,
        selector: HospitalSelector,
        alert_sink: Arc<dyn AlertSink>,
        notifier: Arc<dyn ContactNotifier>,
    ) -> Self {
        tracing::info!(
            "Emergency orchestrator ready with {} hospitals and {} contacts",
            config.hospitals.len(),
            config.contacts.len()
        );

        Self {
            config: Arc::new(config),
            triage: SymptomTriage::new(),
            detector,
            selector,
            alert_sink,
            notifier,
            state_machine: IncidentStateMachine::new(),
        }
    }

    /// 执行完整流程，从紧急情况检测开始
    pub async fn execute_protocol(&self, patient: &PatientContext) -> Result<ProtocolReport> {
        tracing::info!("Initiating emergency protocol for patient at {}", patient.address);
        let mut incident = IncidentRecord::open();

        let signal = self.detector.detect().await;
        if !signal.is_emergency() {
            tracing::warn!("No emergency detected");
            incident.apply(&self.state_machine, IncidentEvent::NoEmergency)?;
            return Ok(ProtocolReport {
                incident,
                outcome: ProtocolOutcome::NoEmergencyDetected,
            });
        }

        incident.apply(&self.state_machine, IncidentEvent::EmergencyDetected)?;
        self.respond(patient, signal.description(), incident).await
    }

    /// 根据调用方提供的症状描述执行流程，跳过检测
    pub async fn respond_to(&self, patient: &PatientContext, description: &str) -> Result<ProtocolReport> {
        tracing::info!("Initiating emergency protocol for patient at {}", patient.address);
        let mut incident = IncidentRecord::open();
        incident.apply(&self.state_machine, IncidentEvent::EmergencyDetected)?;
        self.respond(patient, description, incident).await
    }

    async fn respond(
        &self,
        patient: &PatientContext,
        description: &str,
        mut incident: IncidentRecord,
    ) -> Result<ProtocolReport> {
        let triage = self.triage.classify(description);
        tracing::info!("Triage result: {} ({})", triage.summary, triage.severity);

        if triage.is_critical() {
            tracing::warn!("CRITICAL CONDITION - Contacting emergency services directly");
            incident.apply(&self.state_machine, IncidentEvent::CriticalTriage)?;

            let notice = ContactNotice::CriticalCondition {
                symptoms_summary: triage.summary.clone(),
            };
            let notifications = self.notify_contacts(&notice).await;
            incident.apply(&self.state_machine, IncidentEvent::ContactsNotified)?;

            return Ok(ProtocolReport {
                incident,
                outcome: ProtocolOutcome::CriticalEscalation { triage, notifications },
            });
        }

        incident.apply(&self.state_machine, IncidentEvent::ModerateTriage)?;

        let Some(hospital) = self.selector.select(patient, &self.config.hospitals).await else {
            tracing::error!("No available hospitals found");
            incident.apply(&self.state_machine, IncidentEvent::NoHospitalAvailable)?;

            let notice = ContactNotice::NoHospitalAvailable {
                symptoms_summary: triage.summary.clone(),
            };
            let notifications = self.notify_contacts(&notice).await;
            incident.apply(&self.state_machine, IncidentEvent::ContactsNotified)?;

            return Ok(ProtocolReport {
                incident,
                outcome: ProtocolOutcome::NoAvailableHospital { triage, notifications },
            });
        };

        incident.apply(&self.state_machine, IncidentEvent::HospitalSelected)?;
        let alert_delivered = self.dispatch_alert(&hospital, patient, &triage.summary).await;
        incident.apply(&self.state_machine, IncidentEvent::AlertDispatched)?;

        let notice = ContactNotice::HospitalAlerted {
            hospital_name: hospital.name.clone(),
            hospital_address: hospital.address.clone(),
            hospital_phone: hospital.contact_number.clone(),
            alert_delivered,
        };
        let notifications = self.notify_contacts(&notice).await;
        incident.apply(&self.state_machine, IncidentEvent::ContactsNotified)?;

        tracing::info!("Emergency protocol completed with {}", hospital.name);
        Ok(ProtocolReport {
            incident,
            outcome: ProtocolOutcome::HospitalAlerted {
                triage,
                hospital,
                alert_delivered,
                notifications,
            },
        })
    }

    /// 向医院发送告警，失败时返回 false
    pub(crate) async fn dispatch_alert(
        &self,
        hospital: &Hospital,
        patient: &PatientContext,
        symptoms_summary: &str,
    ) -> bool {
        dispatch_alert(
            self.alert_sink.as_ref(),
            &self.config.message_template,
            hospital,
            patient,
            symptoms_summary,
        )
        .await
    }

    async fn notify_contacts(&self, notice: &ContactNotice) -> Vec<NotificationRecord> {
        let records = notify_all(self.notifier.as_ref(), &self.config.contacts, notice).await;
        let sent = records.iter().filter(|r| r.is_sent()).count();
        tracing::info!("Notified {}/{} emergency contacts", sent, records.len());
        records
    }

    /// 为智能体创建工具集，工具调用仍然走确定性的核心逻辑
    pub fn toolkit(&self, patient: PatientContext) -> EmergencyToolkit {
        EmergencyToolkit::new(
            self.config.clone(),
            patient,
            self.selector.clone(),
            self.alert_sink.clone(),
            self.notifier.clone(),
        )
    }

    pub fn selector(&self) -> &HospitalSelector {
        &self.selector
    }
}

pub(crate) async fn dispatch_alert(
    alert_sink: &dyn AlertSink,
    template: &str,
    hospital: &Hospital,
    patient: &PatientContext,
    symptoms_summary: &str,
) -> bool {
    let payload = match AlertPayload::new(patient, symptoms_summary) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to build alert for {}: {}", hospital.name, e);
            return false;
        }
    };
    let message = payload.render(template);

    tracing::info!("Sending alert to {}", hospital.name);
    match alert_sink.send_alert(hospital, &payload, &message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to alert {}: {}", hospital.name, e);
            false
        }
    }
}
