//! 事件状态机
//!
//! 管理一次急救流程从检测到完成的状态转换

use assist_core::{AssistError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 事件状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IncidentStatus {
    Detecting,         // 检测中
    Triaging,          // 分诊中
    SelectingHospital, // 选择医院
    AlertingHospital,  // 通知医院
    NotifyingContacts, // 通知联系人
    Completed,         // 已完成
    Dismissed,         // 未检测到紧急情况
}

/// 状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IncidentEvent {
    EmergencyDetected,
    NoEmergency,
    CriticalTriage,
    ModerateTriage,
    HospitalSelected,
    NoHospitalAvailable,
    AlertDispatched,
    ContactsNotified,
}

/// 事件状态机
#[derive(Debug)]
pub struct IncidentStateMachine {
    transitions: HashMap<(IncidentStatus, IncidentEvent), IncidentStatus>,
}

impl IncidentStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        use IncidentEvent as E;
        use IncidentStatus as S;

        let mut transitions = HashMap::new();
        transitions.insert((S::Detecting, E::EmergencyDetected), S::Triaging);
        transitions.insert((S::Detecting, E::NoEmergency), S::Dismissed);
        transitions.insert((S::Triaging, E::CriticalTriage), S::NotifyingContacts);
        transitions.insert((S::Triaging, E::ModerateTriage), S::SelectingHospital);
        transitions.insert((S::SelectingHospital, E::HospitalSelected), S::AlertingHospital);
        transitions.insert((S::SelectingHospital, E::NoHospitalAvailable), S::NotifyingContacts);
        transitions.insert((S::AlertingHospital, E::AlertDispatched), S::NotifyingContacts);
        transitions.insert((S::NotifyingContacts, E::ContactsNotified), S::Completed);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: IncidentStatus, event: IncidentEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: IncidentStatus, event: IncidentEvent) -> Result<IncidentStatus> {
        self.transitions
            .get(&(from, event))
            .copied()
            .ok_or_else(|| AssistError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            })
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current: IncidentStatus) -> Vec<IncidentEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for IncidentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// 一次状态转换记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentTransition {
    pub from: IncidentStatus,
    pub event: IncidentEvent,
    pub to: IncidentStatus,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// 事件记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: Uuid,
    pub opened_at: chrono::DateTime<chrono::Utc>,
    pub status: IncidentStatus,
    pub history: Vec<IncidentTransition>,
}

impl IncidentRecord {
    pub fn open() -> Self {
        Self {
            id: Uuid::new_v4(),
            opened_at: chrono::Utc::now(),
            status: IncidentStatus::Detecting,
            history: Vec::new(),
        }
    }

    /// 应用事件并记录转换
    pub fn apply(&mut self, machine: &IncidentStateMachine, event: IncidentEvent) -> Result<IncidentStatus> {
        let to = machine.transition(self.status, event)?;
        tracing::debug!("Incident {} {:?} --{:?}--> {:?}", self.id, self.status, event, to);

        self.history.push(IncidentTransition {
            from: self.status,
            event,
            to,
            at: chrono::Utc::now(),
        });
        self.status = to;
        Ok(to)
    }

    /// 是否已经结束
    pub fn is_closed(&self) -> bool {
        matches!(self.status, IncidentStatus::Completed | IncidentStatus::Dismissed)
    }

    /// 按顺序列出经历过的事件
    pub fn events(&self) -> Vec<IncidentEvent> {
        self.history.iter().map(|t| t.event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = IncidentStateMachine::new();

        assert!(sm.can_transition(IncidentStatus::Detecting, IncidentEvent::EmergencyDetected));
        assert!(sm.can_transition(IncidentStatus::Triaging, IncidentEvent::CriticalTriage));
        assert!(sm.can_transition(IncidentStatus::SelectingHospital, IncidentEvent::NoHospitalAvailable));
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = IncidentStateMachine::new();

        assert!(!sm.can_transition(IncidentStatus::Triaging, IncidentEvent::AlertDispatched));
        assert!(!sm.can_transition(IncidentStatus::Completed, IncidentEvent::EmergencyDetected));
        assert!(matches!(
            sm.transition(IncidentStatus::Dismissed, IncidentEvent::ContactsNotified),
            Err(AssistError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_record_tracks_history() {
        let sm = IncidentStateMachine::new();
        let mut record = IncidentRecord::open();

        record.apply(&sm, IncidentEvent::EmergencyDetected).unwrap();
        record.apply(&sm, IncidentEvent::ModerateTriage).unwrap();
        record.apply(&sm, IncidentEvent::HospitalSelected).unwrap();
        record.apply(&sm, IncidentEvent::AlertDispatched).unwrap();
        assert!(!record.is_closed());
        record.apply(&sm, IncidentEvent::ContactsNotified).unwrap();

        assert!(record.is_closed());
        assert_eq!(record.status, IncidentStatus::Completed);
        assert_eq!(record.history.len(), 5);
        assert_eq!(record.history[0].from, IncidentStatus::Detecting);

        // 失败的转换不改变状态
        assert!(record.apply(&sm, IncidentEvent::NoEmergency).is_err());
        assert_eq!(record.history.len(), 5);
    }

    #[test]
    fn test_possible_events() {
        let sm = IncidentStateMachine::new();
        let mut events = sm.get_possible_events(IncidentStatus::Triaging);
        events.sort_by_key(|e| format!("{:?}", e));
        assert_eq!(events, vec![IncidentEvent::CriticalTriage, IncidentEvent::ModerateTriage]);
    }
}
