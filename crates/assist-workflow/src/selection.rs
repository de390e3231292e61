//! 医院选择
//!
//! 根据可用性和行程时间为候选医院打分，选出综合得分最高的医院

use crate::sources::{AvailabilitySource, TrafficSource};
use assist_core::utils::at_least_one_minute;
use assist_core::{
    AssistError, AvailabilityReport, Hospital, PatientContext, RankedCandidate, Result,
    TrafficReport,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// 单次外部查询的默认超时时间
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// 评分权重
///
/// 行程时间和等待时间都取倒数，越小越好
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub travel: f64,
    pub wait: f64,
}

impl ScoringWeights {
    /// 计算综合得分，分钟数先被钳制到至少为1
    pub fn score(&self, travel_time_minutes: u32, wait_time_minutes: u32) -> f64 {
        let travel = at_least_one_minute(travel_time_minutes) as f64;
        let wait = at_least_one_minute(wait_time_minutes) as f64;
        self.travel * (1.0 / travel) + self.wait * (1.0 / wait)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            travel: 0.7,
            wait: 0.3,
        }
    }
}

/// 医院接收状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeStatus {
    Accepting,   // 接收患者
    Diverting,   // 分流中
    Unreachable, // 查询失败或超时
}

/// 单个医院的完整评估结果，包括未参与排名的医院
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalAssessment {
    pub hospital: Hospital,
    pub status: IntakeStatus,
    pub availability: Option<AvailabilityReport>,
    pub traffic: Option<TrafficReport>,
    pub error: Option<String>,
}

impl HospitalAssessment {
    /// 只有接收患者且有交通数据的医院才能成为候选
    pub fn to_candidate(&self, weights: &ScoringWeights) -> Option<RankedCandidate> {
        let (availability, traffic) = match (&self.status, self.availability, self.traffic) {
            (IntakeStatus::Accepting, Some(availability), Some(traffic)) => (availability, traffic),
            _ => return None,
        };

        let travel_time_minutes = at_least_one_minute(traffic.travel_time_minutes);
        let wait_time_minutes = at_least_one_minute(availability.wait_time_minutes);
        Some(RankedCandidate {
            hospital: self.hospital.clone(),
            travel_time_minutes,
            wait_time_minutes,
            distance_km: traffic.distance_km,
            score: weights.score(travel_time_minutes, wait_time_minutes),
        })
    }
}

// 稳定排序，同分时保持输入顺序
fn sort_candidates(candidates: &mut [RankedCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// 医院选择器
#[derive(Clone)]
pub struct HospitalSelector {
    availability: Arc<dyn AvailabilitySource>,
    traffic: Arc<dyn TrafficSource>,
    weights: ScoringWeights,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for HospitalSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HospitalSelector")
            .field("weights", &self.weights)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl HospitalSelector {
    /// 创建新的医院选择器
    pub fn new(availability: Arc<dyn AvailabilitySource>, traffic: Arc<dyn TrafficSource>) -> Self {
        Self {
            availability,
            traffic,
            weights: ScoringWeights::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// 选出最佳医院
    ///
    /// 没有任何可用医院时返回 `None`；得分相同时保留列表中靠前的医院
    pub async fn select(&self, patient: &PatientContext, hospitals: &[Hospital]) -> Option<Hospital> {
        tracing::info!("Evaluating {} hospital options", hospitals.len());

        let best = self
            .rank(patient, hospitals)
            .await
            .into_iter()
            .next()
            .map(|candidate| candidate.hospital);

        match &best {
            Some(hospital) => tracing::info!("Selected hospital {} ({})", hospital.name, hospital.id),
            None => tracing::warn!("No hospital candidates after availability checks"),
        }
        best
    }

    /// 对可用医院按得分降序排名
    ///
    /// 查询失败或超时的医院被排除，不会中止整个选择过程
    pub async fn rank(&self, patient: &PatientContext, hospitals: &[Hospital]) -> Vec<RankedCandidate> {
        let mut candidates = Vec::with_capacity(hospitals.len());

        for hospital in hospitals {
            let availability = match self.lookup_availability(hospital).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!("Excluding {}: {}", hospital.id, e);
                    continue;
                }
            };

            if !availability.available {
                tracing::info!("{} is not accepting patients", hospital.name);
                continue;
            }

            let traffic = match self.lookup_traffic(patient, hospital).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!("Excluding {}: {}", hospital.id, e);
                    continue;
                }
            };

            let travel_time_minutes = at_least_one_minute(traffic.travel_time_minutes);
            let wait_time_minutes = at_least_one_minute(availability.wait_time_minutes);
            let score = self.weights.score(travel_time_minutes, wait_time_minutes);

            tracing::debug!(
                "Candidate {}: travel={}min wait={}min score={:.4}",
                hospital.id,
                travel_time_minutes,
                wait_time_minutes,
                score
            );

            candidates.push(RankedCandidate {
                hospital: hospital.clone(),
                travel_time_minutes,
                wait_time_minutes,
                distance_km: traffic.distance_km,
                score,
            });
        }

        sort_candidates(&mut candidates);
        candidates
    }

    /// 基于已有评估结果排名，不再重复查询
    pub fn rank_assessments(&self, assessments: &[HospitalAssessment]) -> Vec<RankedCandidate> {
        let mut candidates: Vec<_> = assessments
            .iter()
            .filter_map(|assessment| assessment.to_candidate(&self.weights))
            .collect();
        sort_candidates(&mut candidates);
        candidates
    }

    /// 评估所有医院，不做排除
    pub async fn assess(&self, patient: &PatientContext, hospitals: &[Hospital]) -> Vec<HospitalAssessment> {
        let mut assessments = Vec::with_capacity(hospitals.len());

        for hospital in hospitals {
            let assessment = match self.lookup_availability(hospital).await {
                Err(e) => HospitalAssessment {
                    hospital: hospital.clone(),
                    status: IntakeStatus::Unreachable,
                    availability: None,
                    traffic: None,
                    error: Some(e.to_string()),
                },
                Ok(availability) => {
                    let (traffic, error) = match self.lookup_traffic(patient, hospital).await {
                        Ok(report) => (Some(report), None),
                        Err(e) => (None, Some(e.to_string())),
                    };
                    let status = match (availability.available, &traffic) {
                        (false, _) => IntakeStatus::Diverting,
                        (true, Some(_)) => IntakeStatus::Accepting,
                        (true, None) => IntakeStatus::Unreachable,
                    };
                    HospitalAssessment {
                        hospital: hospital.clone(),
                        status,
                        availability: Some(availability),
                        traffic,
                        error,
                    }
                }
            };
            assessments.push(assessment);
        }

        assessments
    }

    async fn lookup_availability(&self, hospital: &Hospital) -> Result<AvailabilityReport> {
        self.with_timeout(
            format!("availability lookup for {}", hospital.id),
            self.availability.check_availability(hospital),
        )
        .await
    }

    async fn lookup_traffic(&self, patient: &PatientContext, hospital: &Hospital) -> Result<TrafficReport> {
        self.with_timeout(
            format!("traffic lookup for {}", hospital.id),
            self.traffic.estimate_travel(patient.coordinates, hospital.coordinates),
        )
        .await
    }

    async fn with_timeout<T>(
        &self,
        operation: String,
        lookup: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(AssistError::Timeout(format!(
                "{} exceeded {:?}",
                operation, self.lookup_timeout
            ))),
        }
    }
}
