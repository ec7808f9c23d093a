use crate::analysis::alerts::AlertThresholds;
use crate::analysis::metrics::{active_by_amount, active_total, average_or_zero};
use crate::models::category::CostCenterCategory;
use crate::models::metrics::{
    ActivityIndicator, ConcentrationIndicator, ConcentrationLevel, CostCenterMetrics,
    IndicatorReport, IndicatorStatus, IndicatorType, MetricType, RankedCategory, TicketComparison,
    TicketIndicator,
};

const TOP_N: usize = 3;
const SAMPLE_SIZE: usize = 5;

const CONCENTRATION_HIGH: f64 = 80.0;
const CONCENTRATION_MEDIUM: f64 = 60.0;

/// Categories ordered by stored percentage, largest first. Ties keep list order.
fn by_percentage(categories: &[CostCenterCategory], active_only: bool) -> Vec<&CostCenterCategory> {
    let mut sorted: Vec<&CostCenterCategory> = categories
        .iter()
        .filter(|c| !active_only || c.is_active)
        .collect();
    sorted.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    sorted
}

/// Sum of the three largest stored percentages.
pub fn top_three_concentration(categories: &[CostCenterCategory], active_only: bool) -> f64 {
    by_percentage(categories, active_only)
        .into_iter()
        .take(TOP_N)
        .map(|c| c.percentage)
        .sum()
}

pub fn concentration_level(concentration: f64) -> ConcentrationLevel {
    if concentration > CONCENTRATION_HIGH {
        ConcentrationLevel::High
    } else if concentration > CONCENTRATION_MEDIUM {
        ConcentrationLevel::Medium
    } else {
        ConcentrationLevel::Low
    }
}

fn ranked(rank: usize, category: &CostCenterCategory) -> RankedCategory {
    RankedCategory {
        rank,
        id: category.id.clone(),
        name: category.name.clone(),
        amount: category.total_amount,
        percentage: category.percentage,
    }
}

pub fn concentration_indicator(categories: &[CostCenterCategory]) -> ConcentrationIndicator {
    let top: Vec<RankedCategory> = by_percentage(categories, false)
        .into_iter()
        .take(TOP_N)
        .enumerate()
        .map(|(i, c)| ranked(i + 1, c))
        .collect();
    let concentration: f64 = top.iter().map(|c| c.percentage).sum();
    let level = concentration_level(concentration);

    ConcentrationIndicator {
        top_categories: top,
        concentration,
        remainder: 100.0 - concentration,
        level,
        status: match level {
            ConcentrationLevel::High => IndicatorStatus::Danger,
            ConcentrationLevel::Medium => IndicatorStatus::Warning,
            ConcentrationLevel::Low => IndicatorStatus::Success,
        },
    }
}

pub fn activity_indicator(categories: &[CostCenterCategory]) -> ActivityIndicator {
    let active: Vec<&CostCenterCategory> = categories.iter().filter(|c| c.is_active).collect();
    let total_count = categories.len();

    ActivityIndicator {
        total_count,
        active_count: active.len(),
        activity_rate: average_or_zero(active.len() as f64 * 100.0, total_count),
        average_per_active: average_or_zero(active_total(categories), active.len()),
        sample: active
            .iter()
            .take(SAMPLE_SIZE)
            .enumerate()
            .map(|(i, c)| ranked(i + 1, c))
            .collect(),
    }
}

pub fn ticket_indicator(categories: &[CostCenterCategory]) -> TicketIndicator {
    let ordered = active_by_amount(categories);
    let average = average_or_zero(active_total(categories), ordered.len());

    TicketIndicator {
        average,
        highest_amount: ordered.first().map(|c| c.total_amount).unwrap_or(0.0),
        lowest_amount: ordered.last().map(|c| c.total_amount).unwrap_or(0.0),
        comparisons: categories
            .iter()
            .filter(|c| c.is_active)
            .take(SAMPLE_SIZE)
            .map(|c| TicketComparison {
                name: c.name.clone(),
                amount: c.total_amount,
                above_average: c.total_amount > average,
            })
            .collect(),
    }
}

pub fn indicator_report(categories: &[CostCenterCategory], indicator: IndicatorType) -> IndicatorReport {
    match indicator {
        IndicatorType::Concentration => IndicatorReport::Concentration(concentration_indicator(categories)),
        IndicatorType::Categories => IndicatorReport::Categories(activity_indicator(categories)),
        IndicatorType::Ticket => IndicatorReport::Ticket(ticket_indicator(categories)),
    }
}

/// Traffic-light status of one KPI card, on the same thresholds as alerts.
pub fn metric_status(
    metrics: &CostCenterMetrics,
    metric: MetricType,
    thresholds: &AlertThresholds,
) -> IndicatorStatus {
    match metric {
        MetricType::Total => graded(
            metrics.monthly_growth,
            thresholds.growth_warning,
            thresholds.growth_critical,
        ),
        MetricType::Categories => {
            if metrics.category_count < thresholds.min_active_categories {
                IndicatorStatus::Warning
            } else if metrics.category_count > thresholds.max_active_categories {
                IndicatorStatus::Danger
            } else {
                IndicatorStatus::Success
            }
        }
        MetricType::Highest => graded(
            metrics.highest_category.percentage,
            thresholds.concentration_warning,
            thresholds.concentration_critical,
        ),
        MetricType::Lowest => {
            if metrics.lowest_category.percentage < thresholds.low_share {
                IndicatorStatus::Warning
            } else {
                IndicatorStatus::Success
            }
        }
    }
}

fn graded(value: f64, warning: f64, danger: f64) -> IndicatorStatus {
    if value > danger {
        IndicatorStatus::Danger
    } else if value > warning {
        IndicatorStatus::Warning
    } else {
        IndicatorStatus::Success
    }
}
