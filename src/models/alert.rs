use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Condition that produced an alert. The kind is part of the alert id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// One category holds too large a share of expenses.
    HighConcentration,
    /// Active category with a negligible share.
    LowShare,
    /// Active category with no recorded expenses.
    ZeroAmount,
    /// The three largest categories together dominate.
    TopThreeConcentration,
    TooFewCategories,
    TooManyCategories,
    /// Month-over-month expense growth above threshold.
    ExpenseGrowth,
    /// Stored percentages no longer add up to 100.
    PercentageDrift,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighConcentration => "high-concentration",
            Self::LowShare => "low-share",
            Self::ZeroAmount => "zero-amount",
            Self::TopThreeConcentration => "top-three-concentration",
            Self::TooFewCategories => "too-few-categories",
            Self::TooManyCategories => "too-many-categories",
            Self::ExpenseGrowth => "expense-growth",
            Self::PercentageDrift => "percentage-drift",
        }
    }

    /// Stable id for this condition, optionally scoped to one category.
    pub fn alert_id(self, category_id: Option<&str>) -> String {
        match category_id {
            Some(id) => format!("{}-{}", self.as_str(), id),
            None => self.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCenterAlert {
    pub id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_ids_encode_kind_and_category() {
        assert_eq!(
            AlertKind::HighConcentration.alert_id(Some("17000abc")),
            "high-concentration-17000abc"
        );
        assert_eq!(AlertKind::TooFewCategories.alert_id(None), "too-few-categories");
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }
}
