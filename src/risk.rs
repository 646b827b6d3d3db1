use crate::models::{DepartmentHotspot, RiskDriver, RiskDriverKind, RiskOverview};

/// Band boundaries on the 0-100 risk score scale. An employee is high risk
/// at or above 70, medium in [40, 70), low below 40.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;

/// Raw per-driver rollup as read from the database, before ranking.
#[derive(Debug, Clone)]
pub struct DriverRollup {
    pub driver: String,
    pub affected_count: i64,
    pub total_contribution: f64,
}

/// Raw per-department rollup as read from the database.
#[derive(Debug, Clone)]
pub struct HotspotRollup {
    pub department_en: String,
    pub department_ar: String,
    pub employee_count: i64,
    pub avg_risk: f64,
    pub high_count: i64,
}

/// Shapes band counts into an overview. Zero employees means there is
/// nothing to summarize and the caller degrades to baseline actions.
pub fn overview_from_counts(
    total: i64,
    high: i64,
    medium: i64,
    low: i64,
    avg_risk: Option<f64>,
) -> Option<RiskOverview> {
    if total <= 0 {
        return None;
    }
    Some(RiskOverview {
        avg_risk: avg_risk.unwrap_or(0.0),
        high_risk_percentage: percentage(high, total),
        medium_risk_percentage: percentage(medium, total),
        low_risk_percentage: percentage(low, total),
        total_employees: total,
    })
}

/// Normalizes per-driver contribution sums into percentage shares of the
/// total contribution mass and ranks them descending. Ties keep input order.
pub fn rank_drivers(rollups: Vec<DriverRollup>) -> Vec<RiskDriver> {
    let total_mass: f64 = rollups.iter().map(|r| r.total_contribution).sum();

    let mut drivers: Vec<RiskDriver> = rollups
        .into_iter()
        .map(|rollup| RiskDriver {
            driver: RiskDriverKind::parse(&rollup.driver),
            affected_count: rollup.affected_count,
            contribution_percentage: if total_mass > 0.0 {
                rollup.total_contribution * 100.0 / total_mass
            } else {
                0.0
            },
        })
        .collect();

    drivers.sort_by(|a, b| {
        b.contribution_percentage
            .partial_cmp(&a.contribution_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    drivers
}

pub fn shape_hotspots(rollups: Vec<HotspotRollup>) -> Vec<DepartmentHotspot> {
    rollups
        .into_iter()
        .map(|rollup| DepartmentHotspot {
            pct_high: percentage(rollup.high_count, rollup.employee_count),
            department_name_en: rollup.department_en,
            department_name_ar: rollup.department_ar,
            employee_count: rollup.employee_count,
            avg_risk: rollup.avg_risk,
        })
        .collect()
}

pub fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_percentages_sum_to_one_hundred() {
        let overview = overview_from_counts(8, 2, 3, 3, Some(52.5)).unwrap();
        let sum = overview.high_risk_percentage
            + overview.medium_risk_percentage
            + overview.low_risk_percentage;
        assert!((sum - 100.0).abs() < 0.001);
        assert_eq!(overview.total_employees, 8);
        assert!((overview.high_risk_percentage - 25.0).abs() < 0.001);
    }

    #[test]
    fn empty_tenant_has_no_overview() {
        assert!(overview_from_counts(0, 0, 0, 0, None).is_none());
    }

    #[test]
    fn drivers_are_ranked_by_contribution_share() {
        let rollups = vec![
            DriverRollup {
                driver: "Workload".to_string(),
                affected_count: 5,
                total_contribution: 10.0,
            },
            DriverRollup {
                driver: "Compensation".to_string(),
                affected_count: 12,
                total_contribution: 30.0,
            },
        ];

        let drivers = rank_drivers(rollups);
        assert_eq!(drivers[0].driver, RiskDriverKind::Compensation);
        assert!((drivers[0].contribution_percentage - 75.0).abs() < 0.001);
        assert!((drivers[1].contribution_percentage - 25.0).abs() < 0.001);
    }

    #[test]
    fn zero_contribution_mass_does_not_divide() {
        let rollups = vec![DriverRollup {
            driver: "Workload".to_string(),
            affected_count: 3,
            total_contribution: 0.0,
        }];
        let drivers = rank_drivers(rollups);
        assert_eq!(drivers[0].contribution_percentage, 0.0);
    }

    #[test]
    fn hotspot_high_share_is_computed() {
        let hotspots = shape_hotspots(vec![HotspotRollup {
            department_en: "Engineering".to_string(),
            department_ar: "الهندسة".to_string(),
            employee_count: 4,
            avg_risk: 74.0,
            high_count: 3,
        }]);
        assert_eq!(hotspots.len(), 1);
        assert!((hotspots[0].pct_high - 75.0).abs() < 0.001);
    }
}
