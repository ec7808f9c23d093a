use crate::analysis::indicators::top_three_concentration;
use crate::analysis::metrics::active_by_amount;
use crate::models::alert::{AlertKind, AlertSeverity, CostCenterAlert};
use crate::models::category::CostCenterCategory;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Threshold table for smart alerts. Percentages are on a 0–100 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertThresholds {
    pub concentration_warning: f64,
    pub concentration_critical: f64,
    pub low_share: f64,
    pub top_three_warning: f64,
    pub top_three_critical: f64,
    pub min_active_categories: usize,
    pub max_active_categories: usize,
    pub growth_warning: f64,
    pub growth_critical: f64,
    pub percentage_drift_tolerance: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            concentration_warning: 40.0,
            concentration_critical: 60.0,
            low_share: 2.0,
            top_three_warning: 60.0,
            top_three_critical: 80.0,
            min_active_categories: 3,
            max_active_categories: 8,
            growth_warning: 5.0,
            growth_critical: 10.0,
            percentage_drift_tolerance: 1.0,
        }
    }
}

/// Evaluate every alert rule against the category list.
///
/// Output order and ids depend only on the inputs, so running this twice on
/// the same list yields the same ids. Severity lives in the message and the
/// `severity` field, never in the id: an escalation keeps the original alert.
pub fn derive_alerts(
    categories: &[CostCenterCategory],
    monthly_growth: f64,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Vec<CostCenterAlert> {
    let mut alerts = Vec::new();

    for category in categories.iter().filter(|c| c.is_active) {
        if let Some(severity) = graded(
            category.percentage,
            thresholds.concentration_warning,
            thresholds.concentration_critical,
        ) {
            alerts.push(category_alert(
                category,
                AlertKind::HighConcentration,
                severity,
                format!(
                    "{} accounts for {:.1}% of total expenses",
                    category.name, category.percentage
                ),
                now,
            ));
        }

        if category.total_amount <= 0.0 {
            alerts.push(category_alert(
                category,
                AlertKind::ZeroAmount,
                AlertSeverity::Warning,
                format!("{} is active but has no recorded expenses", category.name),
                now,
            ));
        } else if category.percentage < thresholds.low_share {
            alerts.push(category_alert(
                category,
                AlertKind::LowShare,
                AlertSeverity::Info,
                format!(
                    "{} represents only {:.1}% of expenses; consider merging it",
                    category.name, category.percentage
                ),
                now,
            ));
        }
    }

    let ranked = active_by_amount(categories);
    let active_count = ranked.len();

    let concentration = top_three_concentration(categories, true);
    if let Some(severity) = graded(
        concentration,
        thresholds.top_three_warning,
        thresholds.top_three_critical,
    ) {
        alerts.push(global_alert(
            AlertKind::TopThreeConcentration,
            severity,
            format!("Top 3 categories concentrate {concentration:.1}% of expenses"),
            now,
        ));
    }

    if active_count < thresholds.min_active_categories {
        alerts.push(global_alert(
            AlertKind::TooFewCategories,
            AlertSeverity::Warning,
            format!(
                "Only {active_count} active categories; expenses may be poorly classified"
            ),
            now,
        ));
    } else if active_count > thresholds.max_active_categories {
        alerts.push(global_alert(
            AlertKind::TooManyCategories,
            AlertSeverity::Critical,
            format!("{active_count} active categories; consider consolidating"),
            now,
        ));
    }

    if let Some(severity) = graded(monthly_growth, thresholds.growth_warning, thresholds.growth_critical) {
        alerts.push(global_alert(
            AlertKind::ExpenseGrowth,
            severity,
            format!("Expenses grew {monthly_growth:.1}% compared to last month"),
            now,
        ));
    }

    if active_count > 0 {
        let stored_sum: f64 = ranked.iter().map(|c| c.percentage).sum();
        if (stored_sum - 100.0).abs() > thresholds.percentage_drift_tolerance {
            alerts.push(global_alert(
                AlertKind::PercentageDrift,
                AlertSeverity::Info,
                format!(
                    "Category percentages add up to {stored_sum:.1}% instead of 100%"
                ),
                now,
            ));
        }
    }

    alerts
}

/// Union of `existing` and `candidates` keyed by alert id.
///
/// Stored alerts win on collision so their read state survives; new
/// candidates are appended in derivation order. Returns how many were added.
pub fn merge_alerts(existing: &mut Vec<CostCenterAlert>, candidates: Vec<CostCenterAlert>) -> usize {
    let mut known: HashSet<String> = existing.iter().map(|a| a.id.clone()).collect();
    let before = existing.len();

    for candidate in candidates {
        if known.insert(candidate.id.clone()) {
            existing.push(candidate);
        }
    }

    existing.len() - before
}

fn graded(value: f64, warning: f64, critical: f64) -> Option<AlertSeverity> {
    if value > critical {
        Some(AlertSeverity::Critical)
    } else if value > warning {
        Some(AlertSeverity::Warning)
    } else {
        None
    }
}

fn category_alert(
    category: &CostCenterCategory,
    kind: AlertKind,
    severity: AlertSeverity,
    message: String,
    now: DateTime<Utc>,
) -> CostCenterAlert {
    CostCenterAlert {
        id: kind.alert_id(Some(&category.id)),
        category_id: Some(category.id.clone()),
        category_name: Some(category.name.clone()),
        kind,
        severity,
        message,
        is_read: false,
        created_at: now,
    }
}

fn global_alert(
    kind: AlertKind,
    severity: AlertSeverity,
    message: String,
    now: DateTime<Utc>,
) -> CostCenterAlert {
    CostCenterAlert {
        id: kind.alert_id(None),
        category_id: None,
        category_name: None,
        kind,
        severity,
        message,
        is_read: false,
        created_at: now,
    }
}
