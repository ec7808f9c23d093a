use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryHighlight {
    pub name: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Snapshot of the dashboard KPIs. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCenterMetrics {
    pub total_expenses: f64,
    pub category_count: usize,
    pub average_per_category: f64,
    pub highest_category: CategoryHighlight,
    pub lowest_category: CategoryHighlight,
    pub monthly_growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Total,
    Categories,
    Highest,
    Lowest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    Concentration,
    Categories,
    Ticket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorStatus {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCategory {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationIndicator {
    pub top_categories: Vec<RankedCategory>,
    pub concentration: f64,
    pub remainder: f64,
    pub level: ConcentrationLevel,
    pub status: IndicatorStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityIndicator {
    pub total_count: usize,
    pub active_count: usize,
    pub activity_rate: f64,
    pub average_per_active: f64,
    pub sample: Vec<RankedCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComparison {
    pub name: String,
    pub amount: f64,
    pub above_average: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketIndicator {
    pub average: f64,
    pub highest_amount: f64,
    pub lowest_amount: f64,
    pub comparisons: Vec<TicketComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorReport {
    Concentration(ConcentrationIndicator),
    Categories(ActivityIndicator),
    Ticket(TicketIndicator),
}
