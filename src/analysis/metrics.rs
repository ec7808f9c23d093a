use crate::models::category::CostCenterCategory;
use crate::models::metrics::{CategoryHighlight, CostCenterMetrics};

/// Active categories, largest amount first. Ties keep list order.
pub fn active_by_amount(categories: &[CostCenterCategory]) -> Vec<&CostCenterCategory> {
    let mut active: Vec<&CostCenterCategory> = categories.iter().filter(|c| c.is_active).collect();
    active.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    active
}

pub fn active_total(categories: &[CostCenterCategory]) -> f64 {
    categories
        .iter()
        .filter(|c| c.is_active)
        .map(|c| c.total_amount)
        .sum()
}

/// `total / count`, or 0 when there is nothing to divide by.
pub fn average_or_zero(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total / count as f64
}

/// Compute the KPI snapshot for the dashboard header.
/// `monthly_growth` is supplied by the caller; no history is kept here.
pub fn compute_metrics(categories: &[CostCenterCategory], monthly_growth: f64) -> CostCenterMetrics {
    let ranked = active_by_amount(categories);
    let total_expenses = active_total(categories);

    CostCenterMetrics {
        total_expenses,
        category_count: ranked.len(),
        average_per_category: average_or_zero(total_expenses, ranked.len()),
        highest_category: ranked.first().map(|c| highlight(c)).unwrap_or_default(),
        lowest_category: ranked.last().map(|c| highlight(c)).unwrap_or_default(),
        monthly_growth,
    }
}

fn highlight(category: &CostCenterCategory) -> CategoryHighlight {
    CategoryHighlight {
        name: category.name.clone(),
        amount: category.total_amount,
        percentage: category.percentage,
    }
}

/// Each category's share of the active total (inactive → 0), in list order.
pub fn derived_percentages(categories: &[CostCenterCategory]) -> Vec<f64> {
    let total = active_total(categories);
    categories
        .iter()
        .map(|c| {
            if !c.is_active || total <= f64::EPSILON {
                0.0
            } else {
                c.total_amount / total * 100.0
            }
        })
        .collect()
}
