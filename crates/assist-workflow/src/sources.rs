//! 医院可用性与交通数据源
//!
//! 提供查询接口以及基于随机数的模拟实现，真实实现只需满足相同的接口

use assist_core::utils::{planar_distance_km, round_to_hundredths};
use assist_core::{AssistError, AvailabilityReport, Coordinates, Hospital, Result, TrafficReport};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

/// 医院可用性数据源
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// 查询医院当前是否接收患者以及等待时间
    async fn check_availability(&self, hospital: &Hospital) -> Result<AvailabilityReport>;
}

/// 交通数据源
#[async_trait]
pub trait TrafficSource: Send + Sync {
    /// 估算从患者位置到医院的行程时间和距离
    async fn estimate_travel(&self, from: Coordinates, to: Coordinates) -> Result<TrafficReport>;
}

/// 按种子创建随机数生成器，未指定种子时使用系统熵
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn lock_rng(rng: &Mutex<StdRng>) -> Result<std::sync::MutexGuard<'_, StdRng>> {
    rng.lock()
        .map_err(|_| AssistError::Internal("simulation rng lock poisoned".to_string()))
}

/// 模拟的医院可用性数据源
#[derive(Debug)]
pub struct SimulatedAvailabilitySource {
    available_probability: f64,
    min_wait_minutes: u32,
    max_wait_minutes: u32,
    rng: Mutex<StdRng>,
}

impl SimulatedAvailabilitySource {
    pub const DEFAULT_AVAILABLE_PROBABILITY: f64 = 0.8;
    pub const DEFAULT_MIN_WAIT_MINUTES: u32 = 5;
    pub const DEFAULT_MAX_WAIT_MINUTES: u32 = 60;

    /// 创建模拟数据源
    pub fn new(
        available_probability: f64,
        min_wait_minutes: u32,
        max_wait_minutes: u32,
        seed: Option<u64>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&available_probability) {
            return Err(AssistError::Validation(format!(
                "available probability {} must be within [0, 1]",
                available_probability
            )));
        }
        if min_wait_minutes > max_wait_minutes {
            return Err(AssistError::Validation(format!(
                "wait range {}..={} is empty",
                min_wait_minutes, max_wait_minutes
            )));
        }

        Ok(Self {
            available_probability,
            min_wait_minutes,
            max_wait_minutes,
            rng: Mutex::new(seeded_rng(seed)),
        })
    }
}

impl Default for SimulatedAvailabilitySource {
    fn default() -> Self {
        Self {
            available_probability: Self::DEFAULT_AVAILABLE_PROBABILITY,
            min_wait_minutes: Self::DEFAULT_MIN_WAIT_MINUTES,
            max_wait_minutes: Self::DEFAULT_MAX_WAIT_MINUTES,
            rng: Mutex::new(seeded_rng(None)),
        }
    }
}

#[async_trait]
impl AvailabilitySource for SimulatedAvailabilitySource {
    async fn check_availability(&self, hospital: &Hospital) -> Result<AvailabilityReport> {
        tracing::info!("Checking availability for {}", hospital.name);

        let mut rng = lock_rng(&self.rng)?;
        Ok(AvailabilityReport {
            available: rng.gen_bool(self.available_probability),
            wait_time_minutes: rng.gen_range(self.min_wait_minutes..=self.max_wait_minutes),
        })
    }
}

/// 模拟的交通数据源
///
/// 距离使用平面近似，行程时间为距离乘以随机拥堵系数后向下取整
#[derive(Debug)]
pub struct SimulatedTrafficSource {
    min_minutes_per_km: f64,
    max_minutes_per_km: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedTrafficSource {
    pub const DEFAULT_MIN_MINUTES_PER_KM: f64 = 2.0;
    pub const DEFAULT_MAX_MINUTES_PER_KM: f64 = 5.0;

    pub fn new(min_minutes_per_km: f64, max_minutes_per_km: f64, seed: Option<u64>) -> Result<Self> {
        if !min_minutes_per_km.is_finite()
            || !max_minutes_per_km.is_finite()
            || min_minutes_per_km <= 0.0
            || min_minutes_per_km > max_minutes_per_km
        {
            return Err(AssistError::Validation(format!(
                "invalid minutes-per-km range {}..{}",
                min_minutes_per_km, max_minutes_per_km
            )));
        }

        Ok(Self {
            min_minutes_per_km,
            max_minutes_per_km,
            rng: Mutex::new(seeded_rng(seed)),
        })
    }
}

impl Default for SimulatedTrafficSource {
    fn default() -> Self {
        Self {
            min_minutes_per_km: Self::DEFAULT_MIN_MINUTES_PER_KM,
            max_minutes_per_km: Self::DEFAULT_MAX_MINUTES_PER_KM,
            rng: Mutex::new(seeded_rng(None)),
        }
    }
}

#[async_trait]
impl TrafficSource for SimulatedTrafficSource {
    async fn estimate_travel(&self, from: Coordinates, to: Coordinates) -> Result<TrafficReport> {
        tracing::info!("Analyzing traffic from {} to {}", from, to);

        let distance = planar_distance_km(from, to);
        let minutes_per_km = if self.min_minutes_per_km < self.max_minutes_per_km {
            let mut rng = lock_rng(&self.rng)?;
            rng.gen_range(self.min_minutes_per_km..self.max_minutes_per_km)
        } else {
            self.min_minutes_per_km
        };

        Ok(TrafficReport {
            travel_time_minutes: (distance * minutes_per_km) as u32,
            distance_km: round_to_hundredths(distance),
        })
    }
}

/// 固定表驱动的可用性数据源，未登记的医院返回错误
#[derive(Debug, Clone, Default)]
pub struct StaticAvailabilitySource {
    reports: HashMap<String, AvailabilityReport>,
}

impl StaticAvailabilitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, hospital_id: impl Into<String>, report: AvailabilityReport) -> Self {
        self.reports.insert(hospital_id.into(), report);
        self
    }
}

#[async_trait]
impl AvailabilitySource for StaticAvailabilitySource {
    async fn check_availability(&self, hospital: &Hospital) -> Result<AvailabilityReport> {
        self.reports.get(&hospital.id).copied().ok_or_else(|| {
            AssistError::Availability(format!("no availability data for {}", hospital.id))
        })
    }
}

/// 固定表驱动的交通数据源，按目的地坐标查找
#[derive(Debug, Clone, Default)]
pub struct StaticTrafficSource {
    reports: Vec<(Coordinates, TrafficReport)>,
}

impl StaticTrafficSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, destination: Coordinates, report: TrafficReport) -> Self {
        self.reports.push((destination, report));
        self
    }
}

#[async_trait]
impl TrafficSource for StaticTrafficSource {
    async fn estimate_travel(&self, _from: Coordinates, to: Coordinates) -> Result<TrafficReport> {
        self.reports
            .iter()
            .find(|(destination, _)| *destination == to)
            .map(|(_, report)| *report)
            .ok_or_else(|| AssistError::Traffic(format!("no traffic data for destination {}", to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hospital(id: &str, lat: f64, lon: f64) -> Hospital {
        Hospital {
            id: id.to_string(),
            name: format!("Hospital {}", id),
            address: "1 Test Rd".to_string(),
            contact_number: "+10000000000".to_string(),
            coordinates: Coordinates::new(lat, lon).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_simulated_availability_respects_bounds() {
        let source = SimulatedAvailabilitySource::new(1.0, 5, 60, Some(7)).unwrap();
        let target = hospital("hosp_a", 34.0522, -118.2437);

        for _ in 0..50 {
            let report = source.check_availability(&target).await.unwrap();
            assert!(report.available);
            assert!((5..=60).contains(&report.wait_time_minutes));
        }

        let closed = SimulatedAvailabilitySource::new(0.0, 5, 5, Some(7)).unwrap();
        let report = closed.check_availability(&target).await.unwrap();
        assert!(!report.available);
        assert_eq!(report.wait_time_minutes, 5);
    }

    #[test]
    fn test_simulated_sources_reject_invalid_parameters() {
        assert!(SimulatedAvailabilitySource::new(1.5, 5, 60, None).is_err());
        assert!(SimulatedAvailabilitySource::new(0.5, 60, 5, None).is_err());
        assert!(SimulatedTrafficSource::new(5.0, 2.0, None).is_err());
        assert!(SimulatedTrafficSource::new(-1.0, 2.0, None).is_err());
        assert!(SimulatedTrafficSource::new(0.0, 2.0, None).is_err());
    }

    #[tokio::test]
    async fn test_simulated_traffic_uses_planar_distance() {
        let source = SimulatedTrafficSource::new(3.0, 3.0, None).unwrap();
        let from = Coordinates::new(34.0, -118.0).unwrap();
        let to = Coordinates::new(35.0, -118.0).unwrap();

        let report = source.estimate_travel(from, to).await.unwrap();
        assert_eq!(report.distance_km, 111.0);
        assert_eq!(report.travel_time_minutes, 333);
    }

    #[tokio::test]
    async fn test_simulated_traffic_seeded_is_reproducible() {
        let from = Coordinates::new(34.0550, -118.2450).unwrap();
        let to = Coordinates::new(34.0600, -118.2500).unwrap();

        let a = SimulatedTrafficSource::new(2.0, 5.0, Some(42)).unwrap();
        let b = SimulatedTrafficSource::new(2.0, 5.0, Some(42)).unwrap();
        assert_eq!(
            a.estimate_travel(from, to).await.unwrap(),
            b.estimate_travel(from, to).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_static_sources_report_missing_entries() {
        let target = hospital("hosp_a", 34.0522, -118.2437);
        let availability = StaticAvailabilitySource::new();
        assert!(matches!(
            availability.check_availability(&target).await,
            Err(AssistError::Availability(_))
        ));

        let traffic = StaticTrafficSource::new().with_report(
            target.coordinates,
            TrafficReport { travel_time_minutes: 4, distance_km: 1.2 },
        );
        let from = Coordinates::new(34.0, -118.0).unwrap();
        assert_eq!(
            traffic.estimate_travel(from, target.coordinates).await.unwrap().travel_time_minutes,
            4
        );
        assert!(traffic.estimate_travel(from, from).await.is_err());
    }
}
