use crate::analysis::metrics::derived_percentages;
use crate::models::category::{CostCenterCategory, UnitBreakdown};
use chrono::{DateTime, Utc};

/// Business units the seed data is split across.
pub const DEFAULT_UNITS: [&str; 3] = ["downtown", "northside", "westside"];

// name, monthly amount, share per unit (same order as DEFAULT_UNITS)
const SEED: [(&str, f64, [f64; 3]); 6] = [
    ("Payroll", 18_500.0, [0.45, 0.30, 0.25]),
    ("Rent & Facilities", 9_200.0, [0.50, 0.25, 0.25]),
    ("Marketing", 3_800.0, [0.40, 0.35, 0.25]),
    ("Instruments & Equipment", 2_600.0, [0.30, 0.40, 0.30]),
    ("Utilities", 1_900.0, [0.40, 0.30, 0.30]),
    ("Administrative", 1_400.0, [0.60, 0.20, 0.20]),
];

// 2024-01-01T00:00:00Z
const SEED_CREATED_AT: i64 = 1_704_067_200;

/// Category list used when nothing usable is stored yet.
pub fn default_categories() -> Vec<CostCenterCategory> {
    let created_at = DateTime::<Utc>::from_timestamp(SEED_CREATED_AT, 0).unwrap_or_default();

    let unit_totals: Vec<f64> = (0..DEFAULT_UNITS.len())
        .map(|u| SEED.iter().map(|(_, amount, split)| amount * split[u]).sum())
        .collect();

    let mut categories: Vec<CostCenterCategory> = SEED
        .iter()
        .enumerate()
        .map(|(index, (name, amount, split))| CostCenterCategory {
            id: format!("default-{}", index + 1),
            name: name.to_string(),
            total_amount: *amount,
            percentage: 0.0,
            is_active: true,
            unit_breakdown: DEFAULT_UNITS
                .iter()
                .enumerate()
                .map(|(u, unit_id)| {
                    let unit_amount = amount * split[u];
                    UnitBreakdown {
                        unit_id: unit_id.to_string(),
                        amount: unit_amount,
                        percentage: unit_amount / unit_totals[u] * 100.0,
                    }
                })
                .collect(),
            created_at,
            updated_at: created_at,
        })
        .collect();

    let shares = derived_percentages(&categories);
    for (category, share) in categories.iter_mut().zip(shares) {
        category.percentage = share;
    }

    categories
}
