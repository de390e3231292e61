//! 医院告警与紧急联系人通知
//!
//! 告警和通知都通过接口发送，默认实现只写日志

use assist_core::{AlertPayload, ContactNotice, EmergencyContact, Hospital, Result};
pub use assist_core::DEFAULT_MESSAGE_TEMPLATE;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 医院告警发送接口
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, hospital: &Hospital, payload: &AlertPayload, message: &str) -> Result<()>;
}

/// 紧急联系人通知接口
#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn notify(&self, contact: &EmergencyContact, notice: &ContactNotice) -> Result<()>;
}

/// 只写日志的告警发送器
#[derive(Debug, Clone, Default)]
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn send_alert(&self, hospital: &Hospital, _payload: &AlertPayload, message: &str) -> Result<()> {
        tracing::info!(
            hospital_id = %hospital.id,
            contact_number = %hospital.contact_number,
            "Sending alert to {}: {}",
            hospital.name,
            message
        );
        Ok(())
    }
}

/// 只写日志的联系人通知器
#[derive(Debug, Clone, Default)]
pub struct LoggingContactNotifier;

#[async_trait]
impl ContactNotifier for LoggingContactNotifier {
    async fn notify(&self, contact: &EmergencyContact, notice: &ContactNotice) -> Result<()> {
        tracing::info!("Notifying {} at {}: {}", contact.name, contact.phone, notice.message());
        Ok(())
    }
}

/// 通知状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    Sent,   // 已发送
    Failed, // 发送失败
}

/// 通知记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub contact: EmergencyContact,
    pub notice: ContactNotice,
    pub sent_at: chrono::DateTime<chrono::Utc>,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
}

impl NotificationRecord {
    pub fn is_sent(&self) -> bool {
        self.status == NotificationStatus::Sent
    }
}

/// 逐个通知所有紧急联系人
///
/// 单个联系人失败只记录错误，不影响其余联系人，也不重试
pub async fn notify_all(
    notifier: &dyn ContactNotifier,
    contacts: &[EmergencyContact],
    notice: &ContactNotice,
) -> Vec<NotificationRecord> {
    let mut records = Vec::with_capacity(contacts.len());

    for contact in contacts {
        let mut record = NotificationRecord {
            id: Uuid::new_v4(),
            contact: contact.clone(),
            notice: notice.clone(),
            sent_at: chrono::Utc::now(),
            status: NotificationStatus::Sent,
            error_message: None,
        };

        if let Err(e) = notifier.notify(contact, notice).await {
            tracing::error!("Failed to notify {} at {}: {}", contact.name, contact.phone, e);
            record.status = NotificationStatus::Failed;
            record.error_message = Some(e.to_string());
        }

        records.push(record);
    }

    records
}
