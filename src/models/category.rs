use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit id that selects the whole organisation in unit projections.
pub const ALL_UNITS: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBreakdown {
    pub unit_id: String,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCenterCategory {
    pub id: String,
    pub name: String,
    pub total_amount: f64,
    pub percentage: f64, // share of total expenses, 0–100
    pub is_active: bool,
    #[serde(default)]
    pub unit_breakdown: Vec<UnitBreakdown>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a caller supplies when creating a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub total_amount: f64,
    pub percentage: f64,
    pub is_active: bool,
    #[serde(default)]
    pub unit_breakdown: Vec<UnitBreakdown>,
}

/// Partial update. `id` and `createdAt` have no slot here, so they are
/// dropped if a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_breakdown: Option<Vec<UnitBreakdown>>,
}

impl CostCenterCategory {
    pub fn from_new(id: String, data: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name,
            total_amount: data.total_amount,
            percentage: data.percentage,
            is_active: data.is_active,
            unit_breakdown: data.unit_breakdown,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the fields present in `patch` and refreshes `updated_at`,
    /// never letting it fall behind `created_at`.
    pub fn apply_patch(&mut self, patch: CategoryPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(total_amount) = patch.total_amount {
            self.total_amount = total_amount;
        }
        if let Some(percentage) = patch.percentage {
            self.percentage = percentage;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(unit_breakdown) = patch.unit_breakdown {
            self.unit_breakdown = unit_breakdown;
        }
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at).max(self.updated_at);
    }

    pub fn unit_entry(&self, unit_id: &str) -> Option<&UnitBreakdown> {
        self.unit_breakdown.iter().find(|u| u.unit_id == unit_id)
    }

    /// Read-only view of this category restricted to one unit.
    pub fn project_to_unit(&self, unit_id: &str) -> Self {
        let (amount, percentage) = self
            .unit_entry(unit_id)
            .map(|u| (u.amount, u.percentage))
            .unwrap_or((0.0, 0.0));

        Self {
            total_amount: amount,
            percentage,
            ..self.clone()
        }
    }
}
