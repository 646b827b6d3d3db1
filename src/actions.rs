use serde_json::json;

use crate::models::{ActionPlan, DepartmentHotspot, Priority, RiskDriver, RiskDriverKind, RiskOverview};

/// Hard cap on plans per generation run.
pub const MAX_ACTION_PLANS: usize = 5;

/// High-risk share above which the emergency review fires.
pub const EMERGENCY_HIGH_RISK_PCT: f64 = 15.0;

/// Department average risk above which an intervention is raised.
pub const HOTSPOT_AVG_RISK: f64 = 70.0;

/// Maps the aggregates onto candidate action plans. Pure and deterministic:
/// same inputs, same ordered output. Missing upstream data degrades to the
/// two standing recommendations, never to an error.
///
/// Candidates are collected in rule-evaluation order, stable-sorted by
/// priority tier, then capped at [`MAX_ACTION_PLANS`].
pub fn build_action_plans(
    overview: Option<&RiskOverview>,
    drivers: &[RiskDriver],
    hotspots: &[DepartmentHotspot],
) -> Vec<ActionPlan> {
    let mut plans = Vec::new();

    if let Some(overview) = overview {
        if overview.high_risk_percentage > EMERGENCY_HIGH_RISK_PCT {
            plans.push(ActionPlan {
                title: "Emergency Retention Review".to_string(),
                description: format!(
                    "{:.1}% of employees sit in the high risk band (average risk {:.1}). \
                     Convene an immediate retention review with department heads.",
                    overview.high_risk_percentage, overview.avg_risk
                ),
                priority: Priority::High,
                evidence: json!({
                    "avg_risk": overview.avg_risk,
                    "high_risk_percentage": overview.high_risk_percentage,
                }),
            });
        }
    }

    // Only the highest-contribution driver gets a dedicated playbook.
    if let Some(top) = drivers.first() {
        match &top.driver {
            RiskDriverKind::Compensation => plans.push(ActionPlan {
                title: "Compensation Review Initiative".to_string(),
                description: format!(
                    "Compensation is the top attrition driver, affecting {} employees \
                     ({:.1}% of total risk contribution). Benchmark pay bands against \
                     market and fast-track adjustments for the affected group.",
                    top.affected_count, top.contribution_percentage
                ),
                priority: Priority::High,
                evidence: json!({
                    "driver": top.driver.as_str(),
                    "affected_count": top.affected_count,
                    "contribution_percentage": top.contribution_percentage,
                }),
            }),
            RiskDriverKind::ManagerRelationship => plans.push(ActionPlan {
                title: "Manager Training Program".to_string(),
                description: format!(
                    "Manager relationship is the top attrition driver, affecting {} \
                     employees ({:.1}% of total risk contribution). Launch coaching for \
                     the managers of the affected teams.",
                    top.affected_count, top.contribution_percentage
                ),
                priority: Priority::High,
                evidence: json!({
                    "driver": top.driver.as_str(),
                    "affected_count": top.affected_count,
                    "contribution_percentage": top.contribution_percentage,
                }),
            }),
            // No dedicated playbook yet for the remaining drivers.
            RiskDriverKind::Workload
            | RiskDriverKind::CareerGrowth
            | RiskDriverKind::WorkLifeBalance
            | RiskDriverKind::Recognition
            | RiskDriverKind::Other(_) => {}
        }
    }

    for hotspot in hotspots.iter().filter(|h| h.avg_risk > HOTSPOT_AVG_RISK) {
        plans.push(ActionPlan {
            title: format!("{} Department Intervention", hotspot.department_name_en),
            description: format!(
                "The {} department averages {:.1} risk across {} employees, with \
                 {:.1}% in the high band. Schedule stay interviews and a workload \
                 review with the department lead.",
                hotspot.department_name_en,
                hotspot.avg_risk,
                hotspot.employee_count,
                hotspot.pct_high
            ),
            priority: Priority::High,
            evidence: json!({
                "department_en": hotspot.department_name_en,
                "department_ar": hotspot.department_name_ar,
                "employee_count": hotspot.employee_count,
                "avg_risk": hotspot.avg_risk,
                "pct_high": hotspot.pct_high,
            }),
        });
    }

    // Standing continuous-improvement actions, appended on every run.
    plans.push(ActionPlan {
        title: "Monthly Retention Pulse Survey".to_string(),
        description: "Run a short monthly pulse survey to track retention sentiment \
                      and catch emerging drivers early."
            .to_string(),
        priority: Priority::Medium,
        evidence: json!({ "action_type": "proactive_monitoring" }),
    });
    plans.push(ActionPlan {
        title: "Manager Retention Training Program".to_string(),
        description: "Enroll people managers in retention conversation training as an \
                      ongoing capability investment."
            .to_string(),
        priority: Priority::Medium,
        evidence: json!({ "action_type": "capability_building" }),
    });

    plans.sort_by_key(|plan| plan.priority.rank());
    plans.truncate(MAX_ACTION_PLANS);
    plans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overview(avg_risk: f64, high_pct: f64) -> RiskOverview {
        RiskOverview {
            avg_risk,
            high_risk_percentage: high_pct,
            medium_risk_percentage: 30.0,
            low_risk_percentage: 100.0 - high_pct - 30.0,
            total_employees: 120,
        }
    }

    fn driver(kind: RiskDriverKind, affected: i64, contribution: f64) -> RiskDriver {
        RiskDriver {
            driver: kind,
            affected_count: affected,
            contribution_percentage: contribution,
        }
    }

    fn hotspot(name_en: &str, avg_risk: f64) -> DepartmentHotspot {
        DepartmentHotspot {
            department_name_en: name_en.to_string(),
            department_name_ar: String::new(),
            employee_count: 20,
            avg_risk,
            pct_high: 40.0,
        }
    }

    fn titles(plans: &[ActionPlan]) -> Vec<&str> {
        plans.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn emergency_review_fires_above_threshold() {
        let plans = build_action_plans(Some(&overview(45.0, 15.1)), &[], &[]);
        assert_eq!(
            titles(&plans)
                .iter()
                .filter(|t| **t == "Emergency Retention Review")
                .count(),
            1
        );

        let plans = build_action_plans(Some(&overview(45.0, 15.0)), &[], &[]);
        assert!(!titles(&plans).contains(&"Emergency Retention Review"));
    }

    #[test]
    fn only_the_top_driver_is_inspected() {
        let drivers = vec![
            driver(RiskDriverKind::Compensation, 30, 41.7),
            driver(RiskDriverKind::ManagerRelationship, 18, 25.0),
        ];
        let plans = build_action_plans(None, &drivers, &[]);
        let titles = titles(&plans);
        assert!(titles.contains(&"Compensation Review Initiative"));
        assert!(!titles.contains(&"Manager Training Program"));
    }

    #[test]
    fn manager_relationship_top_driver_gets_training_plan() {
        let drivers = vec![driver(RiskDriverKind::ManagerRelationship, 18, 25.0)];
        let plans = build_action_plans(None, &drivers, &[]);
        assert!(titles(&plans).contains(&"Manager Training Program"));
    }

    #[test]
    fn unmapped_top_driver_emits_no_specific_plan() {
        let drivers = vec![driver(RiskDriverKind::Workload, 40, 60.0)];
        let plans = build_action_plans(None, &drivers, &[]);
        assert_eq!(plans.len(), 2);
    }

    #[test]
    fn hotspots_fan_out_one_plan_per_hot_department() {
        let hotspots = vec![
            hotspot("Engineering", 80.0),
            hotspot("Sales", 72.0),
            hotspot("Finance", 65.0),
        ];
        let plans = build_action_plans(None, &[], &hotspots);
        let titles = titles(&plans);
        assert!(titles.contains(&"Engineering Department Intervention"));
        assert!(titles.contains(&"Sales Department Intervention"));
        assert!(!titles.contains(&"Finance Department Intervention"));
    }

    #[test]
    fn seven_candidates_truncate_to_five_in_rule_order() {
        // 1 emergency + 1 driver + 3 hotspots + 2 standing = 7 candidates.
        let drivers = vec![driver(RiskDriverKind::Compensation, 30, 41.7)];
        let hotspots = vec![
            hotspot("Engineering", 85.0),
            hotspot("Sales", 78.0),
            hotspot("Operations", 71.0),
        ];
        let plans = build_action_plans(Some(&overview(62.0, 28.0)), &drivers, &hotspots);

        assert_eq!(plans.len(), MAX_ACTION_PLANS);
        assert_eq!(
            titles(&plans),
            vec![
                "Emergency Retention Review",
                "Compensation Review Initiative",
                "Engineering Department Intervention",
                "Sales Department Intervention",
                "Operations Department Intervention",
            ]
        );
    }

    #[test]
    fn missing_data_degrades_to_standing_rules() {
        let plans = build_action_plans(None, &[], &[]);
        assert_eq!(
            titles(&plans),
            vec![
                "Monthly Retention Pulse Survey",
                "Manager Retention Training Program",
            ]
        );
        assert!(plans.iter().all(|p| p.priority == Priority::Medium));
    }

    #[test]
    fn end_to_end_scenario_produces_four_plans() {
        let drivers = vec![driver(RiskDriverKind::Compensation, 30, 41.7)];
        let plans = build_action_plans(Some(&overview(45.0, 22.0)), &drivers, &[]);

        assert_eq!(plans.len(), 4);
        let emergency = &plans[0];
        assert_eq!(emergency.title, "Emergency Retention Review");
        assert!(emergency.description.contains("22.0"));
        assert!(emergency.description.contains("45.0"));
        assert_eq!(emergency.evidence["high_risk_percentage"], 22.0);

        let compensation = &plans[1];
        assert_eq!(compensation.title, "Compensation Review Initiative");
        assert!(compensation.description.contains("30"));
        assert!(compensation.description.contains("41.7"));
        assert_eq!(compensation.evidence["affected_count"], 30);

        assert_eq!(plans[2].title, "Monthly Retention Pulse Survey");
        assert_eq!(plans[3].title, "Manager Retention Training Program");
    }

    #[test]
    fn high_priority_plans_sort_ahead_of_standing_rules() {
        let hotspots: Vec<DepartmentHotspot> =
            (0..4).map(|i| hotspot(&format!("Dept{i}"), 75.0)).collect();
        let plans = build_action_plans(None, &[], &hotspots);
        assert_eq!(plans.len(), MAX_ACTION_PLANS);
        assert!(plans[..4].iter().all(|p| p.priority == Priority::High));
        assert_eq!(plans[4].title, "Monthly Retention Pulse Survey");
    }
}
