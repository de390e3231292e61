//! 通用工具函数

use crate::models::Coordinates;

/// 每纬度对应的公里数
const KM_PER_DEGREE_LAT: f64 = 111.0;
/// 目标区域每经度对应的公里数（中纬度近似值）
const KM_PER_DEGREE_LON: f64 = 85.0;

/// 两点之间的平面近似距离（公里）
pub fn planar_distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat_km = (to.lat() - from.lat()) * KM_PER_DEGREE_LAT;
    let lon_km = (to.lon() - from.lon()) * KM_PER_DEGREE_LON;
    (lat_km * lat_km + lon_km * lon_km).sqrt()
}

/// 保留两位小数
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 分钟数至少为1，用作评分分母
pub fn at_least_one_minute(minutes: u32) -> u32 {
    minutes.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_distance() {
        let a = Coordinates::new(34.0, -118.0).unwrap();
        let b = Coordinates::new(35.0, -118.0).unwrap();
        assert!((planar_distance_km(a, b) - 111.0).abs() < 1e-9);

        let c = Coordinates::new(34.0, -117.0).unwrap();
        assert!((planar_distance_km(a, c) - 85.0).abs() < 1e-9);
        assert_eq!(planar_distance_km(a, a), 0.0);
    }

    #[test]
    fn test_round_to_hundredths() {
        assert_eq!(round_to_hundredths(1.23456), 1.23);
        assert_eq!(round_to_hundredths(2.346), 2.35);
    }

    #[test]
    fn test_at_least_one_minute() {
        assert_eq!(at_least_one_minute(0), 1);
        assert_eq!(at_least_one_minute(7), 7);
    }
}
