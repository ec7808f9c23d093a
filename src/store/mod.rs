pub mod defaults;
pub mod kv;

use crate::analysis::alerts::{derive_alerts, merge_alerts, AlertThresholds};
use crate::analysis::indicators::{indicator_report, metric_status};
use crate::analysis::metrics::{compute_metrics, derived_percentages};
use crate::error::StoreResult;
use crate::models::alert::CostCenterAlert;
use crate::models::category::{CategoryPatch, CostCenterCategory, NewCategory, ALL_UNITS};
use crate::models::metrics::{CostCenterMetrics, IndicatorReport, IndicatorStatus, IndicatorType, MetricType};
use chrono::Utc;
use kv::KeyValueStore;
use serde::de::DeserializeOwned;

pub const DEFAULT_NAMESPACE: &str = "costlens";
pub const DEFAULT_MONTHLY_GROWTH: f64 = 2.3;

const CATEGORIES_SUFFIX: &str = "cost-center-categories";
const ALERTS_SUFFIX: &str = "cost-center-alerts";

#[derive(Debug, Clone, PartialEq)]
pub struct StorageKeys {
    pub categories: String,
    pub alerts: String,
}

impl StorageKeys {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            categories: format!("{namespace}-{CATEGORIES_SUFFIX}"),
            alerts: format!("{namespace}-{ALERTS_SUFFIX}"),
        }
    }
}

/// Inputs the store needs beyond its storage backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub namespace: String,
    /// Month-over-month growth shown on the dashboard; not derived from history.
    pub monthly_growth: f64,
    pub thresholds: AlertThresholds,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            monthly_growth: DEFAULT_MONTHLY_GROWTH,
            thresholds: AlertThresholds::default(),
        }
    }
}

/// Owns the category and alert lists and mirrors both to a key-value store.
///
/// Every mutation builds the next list, writes it, and only then swaps it in,
/// so a failed write leaves the in-memory state as it was. Alerts are derived
/// when categories change and on a load that finds no alert record, so
/// dismissals stick across restarts.
pub struct CategoryStore<K: KeyValueStore> {
    kv: K,
    keys: StorageKeys,
    config: StoreConfig,
    categories: Vec<CostCenterCategory>,
    alerts: Vec<CostCenterAlert>,
}

impl<K: KeyValueStore> CategoryStore<K> {
    pub fn load(kv: K, config: StoreConfig) -> StoreResult<Self> {
        let keys = StorageKeys::for_namespace(&config.namespace);

        let categories = match kv.get(&keys.categories)? {
            Some(raw) => parse_or_else(&raw, &keys.categories, defaults::default_categories),
            None => defaults::default_categories(),
        };
        // No usable alert record yet: derive one once. A stored list, even an
        // empty one, reflects the user's dismissals and is left alone.
        let stored_alerts = match kv.get(&keys.alerts)? {
            Some(raw) => match serde_json::from_str::<Vec<CostCenterAlert>>(&raw) {
                Ok(alerts) => Some(alerts),
                Err(e) => {
                    log::warn!("Malformed data under '{}', deriving alerts again: {e}", keys.alerts);
                    None
                }
            },
            None => None,
        };
        let needs_alerts = stored_alerts.is_none();
        let alerts = stored_alerts.unwrap_or_default();

        log::info!(
            "Loaded {} categories and {} alerts from '{}'",
            categories.len(),
            alerts.len(),
            config.namespace
        );

        let mut store = Self {
            kv,
            keys,
            config,
            categories,
            alerts,
        };
        if needs_alerts {
            store.regenerate_alerts()?;
        }
        Ok(store)
    }

    pub fn categories(&self) -> &[CostCenterCategory] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&CostCenterCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn alerts(&self) -> &[CostCenterAlert] {
        &self.alerts
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn add(&mut self, data: NewCategory) -> StoreResult<CostCenterCategory> {
        let category = CostCenterCategory::from_new(self.next_id(), data, Utc::now());

        let mut next = self.categories.clone();
        next.push(category.clone());
        self.commit_categories(next)?;

        Ok(category)
    }

    /// Returns `None` without writing anything when `id` is unknown.
    pub fn update(&mut self, id: &str, patch: CategoryPatch) -> StoreResult<Option<CostCenterCategory>> {
        let Some(index) = self.categories.iter().position(|c| c.id == id) else {
            log::debug!("Update skipped: no category with id {id}");
            return Ok(None);
        };

        let mut next = self.categories.clone();
        next[index].apply_patch(patch, Utc::now());
        let updated = next[index].clone();
        self.commit_categories(next)?;

        Ok(Some(updated))
    }

    /// Returns `false` without writing anything when `id` is unknown.
    pub fn delete(&mut self, id: &str) -> StoreResult<bool> {
        if self.category(id).is_none() {
            log::debug!("Delete skipped: no category with id {id}");
            return Ok(false);
        }

        let next: Vec<CostCenterCategory> = self
            .categories
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        self.commit_categories(next)?;

        Ok(true)
    }

    /// Recompute every percentage from amounts. Returns how many changed.
    pub fn rebalance_percentages(&mut self) -> StoreResult<usize> {
        let now = Utc::now();
        let mut next = self.categories.clone();
        let mut changed = 0;

        for (category, share) in next.iter_mut().zip(derived_percentages(&self.categories)) {
            if (category.percentage - share).abs() > f64::EPSILON {
                category.percentage = share;
                category.touch(now);
                changed += 1;
            }
        }

        if changed > 0 {
            self.commit_categories(next)?;
        }
        Ok(changed)
    }

    pub fn metrics(&self) -> CostCenterMetrics {
        compute_metrics(&self.categories, self.config.monthly_growth)
    }

    /// Category list as seen from one business unit. Never persisted.
    pub fn categories_by_unit(&self, unit_id: &str) -> Vec<CostCenterCategory> {
        if unit_id == ALL_UNITS {
            return self.categories.clone();
        }
        self.categories
            .iter()
            .map(|c| c.project_to_unit(unit_id))
            .collect()
    }

    pub fn indicator(&self, indicator: IndicatorType) -> IndicatorReport {
        indicator_report(&self.categories, indicator)
    }

    pub fn metric_status(&self, metric: MetricType) -> IndicatorStatus {
        metric_status(&self.metrics(), metric, &self.config.thresholds)
    }

    pub fn mark_alert_read(&mut self, alert_id: &str) -> StoreResult<bool> {
        let Some(index) = self.alerts.iter().position(|a| a.id == alert_id) else {
            return Ok(false);
        };

        let mut next = self.alerts.clone();
        next[index].is_read = true;
        self.commit_alerts(next)?;
        Ok(true)
    }

    pub fn dismiss_alert(&mut self, alert_id: &str) -> StoreResult<bool> {
        if !self.alerts.iter().any(|a| a.id == alert_id) {
            return Ok(false);
        }

        let next: Vec<CostCenterAlert> = self
            .alerts
            .iter()
            .filter(|a| a.id != alert_id)
            .cloned()
            .collect();
        self.commit_alerts(next)?;
        Ok(true)
    }

    /// Replace the alert list with a fresh derivation, dropping read state.
    pub fn refresh_alerts(&mut self) -> StoreResult<&[CostCenterAlert]> {
        let next = derive_alerts(
            &self.categories,
            self.config.monthly_growth,
            &self.config.thresholds,
            Utc::now(),
        );
        self.commit_alerts(next)?;
        Ok(&self.alerts)
    }

    /// Categories are the authoritative write. Once they are stored the
    /// change is reported as done; a failed alert write only keeps the
    /// previous alert list and is retried on the next change.
    fn commit_categories(&mut self, next: Vec<CostCenterCategory>) -> StoreResult<()> {
        let merged = self.merged_alerts(&next);
        let raw = serde_json::to_string(&next)?;
        self.kv.set(&self.keys.categories, &raw)?;
        self.categories = next;

        if let Some(alerts) = merged {
            if let Err(e) = self.commit_alerts(alerts) {
                log::warn!("Categories saved but alerts could not be written: {e}");
            }
        }
        Ok(())
    }

    fn commit_alerts(&mut self, next: Vec<CostCenterAlert>) -> StoreResult<()> {
        let raw = serde_json::to_string(&next)?;
        self.kv.set(&self.keys.alerts, &raw)?;
        self.alerts = next;
        Ok(())
    }

    fn regenerate_alerts(&mut self) -> StoreResult<()> {
        if let Some(next) = self.merged_alerts(&self.categories) {
            self.commit_alerts(next)?;
        }
        Ok(())
    }

    /// Current alerts merged by id with the conditions `categories` trigger,
    /// or `None` when nothing new fired.
    fn merged_alerts(&self, categories: &[CostCenterCategory]) -> Option<Vec<CostCenterAlert>> {
        if categories.is_empty() {
            return None;
        }

        let candidates = derive_alerts(
            categories,
            self.config.monthly_growth,
            &self.config.thresholds,
            Utc::now(),
        );
        let mut next = self.alerts.clone();
        let added = merge_alerts(&mut next, candidates);

        if added == 0 {
            return None;
        }
        log::debug!("Regenerated alerts: {added} new");
        Some(next)
    }

    /// `<unix millis><9 random hex chars>`, re-rolled on the rare collision.
    fn next_id(&self) -> String {
        loop {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let id = format!("{}{}", Utc::now().timestamp_millis(), &suffix[..9]);
            if self.category(&id).is_none() {
                return id;
            }
        }
    }
}

fn parse_or_else<T, F>(raw: &str, key: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::warn!("Malformed data under '{key}', using defaults: {e}");
        fallback()
    })
}

#[cfg(test)]
mod tests {
    use super::kv::MemoryKv;
    use super::*;
    use crate::models::alert::AlertKind;
    use crate::models::category::UnitBreakdown;

    fn new_category(name: &str, amount: f64, percentage: f64) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            total_amount: amount,
            percentage,
            is_active: true,
            unit_breakdown: vec![
                UnitBreakdown {
                    unit_id: "north".to_string(),
                    amount: amount * 0.6,
                    percentage: percentage * 0.6,
                },
                UnitBreakdown {
                    unit_id: "south".to_string(),
                    amount: amount * 0.4,
                    percentage: percentage * 0.4,
                },
            ],
        }
    }

    /// Store seeded with four categories of 100..400 and matching percentages.
    fn seeded(kv: &MemoryKv) -> CategoryStore<&MemoryKv> {
        let keys = StorageKeys::for_namespace(DEFAULT_NAMESPACE);
        kv.set(&keys.categories, "[]").unwrap();
        let mut store = CategoryStore::load(kv, StoreConfig::default()).unwrap();
        for (i, amount) in [100.0, 200.0, 300.0, 400.0].into_iter().enumerate() {
            store
                .add(new_category(&format!("Category {}", i + 1), amount, amount / 10.0))
                .unwrap();
        }
        store
    }

    fn sorted_by_id(mut categories: Vec<CostCenterCategory>) -> Vec<CostCenterCategory> {
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        categories
    }

    #[test]
    fn empty_storage_loads_default_categories() {
        let kv = MemoryKv::new();
        let store = CategoryStore::load(&kv, StoreConfig::default()).unwrap();

        assert_eq!(store.categories(), defaults::default_categories().as_slice());
    }

    #[test]
    fn corrupted_categories_fall_back_to_defaults() {
        let keys = StorageKeys::for_namespace(DEFAULT_NAMESPACE);
        let kv = MemoryKv::new()
            .with_entry(&keys.categories, "{not json")
            .with_entry(&keys.alerts, "[{\"broken\":");

        let store = CategoryStore::load(&kv, StoreConfig::default()).unwrap();

        assert_eq!(store.categories(), defaults::default_categories().as_slice());
        assert!(store.alerts().iter().all(|a| !a.is_read));
    }

    #[test]
    fn load_parses_stored_timestamps() {
        let keys = StorageKeys::for_namespace("school");
        let raw = r#"[{"id":"1","name":"Rent","totalAmount":10,"percentage":100,"isActive":true,
            "unitBreakdown":[],"createdAt":"2024-02-01T10:00:00.000Z","updatedAt":"2024-02-03T10:00:00.000Z"}]"#;
        let kv = MemoryKv::new().with_entry(&keys.categories, raw);
        let config = StoreConfig {
            namespace: "school".to_string(),
            ..StoreConfig::default()
        };

        let store = CategoryStore::load(&kv, config).unwrap();

        let category = store.category("1").expect("stored category");
        assert_eq!(category.created_at.to_rfc3339(), "2024-02-01T10:00:00+00:00");
        assert!(category.updated_at > category.created_at);
    }

    #[test]
    fn metrics_match_known_amounts() {
        let kv = MemoryKv::new();
        let store = seeded(&kv);

        let metrics = store.metrics();

        assert_eq!(metrics.total_expenses, 1000.0);
        assert_eq!(metrics.category_count, 4);
        assert_eq!(metrics.average_per_category, 250.0);
        assert_eq!(metrics.highest_category.amount, 400.0);
        assert_eq!(metrics.highest_category.percentage, 40.0);
        assert_eq!(metrics.lowest_category.amount, 100.0);
        assert_eq!(metrics.lowest_category.percentage, 10.0);
        assert_eq!(metrics.monthly_growth, DEFAULT_MONTHLY_GROWTH);
    }

    #[test]
    fn add_assigns_unique_ids_and_persists() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);

        let a = store.add(new_category("A", 1.0, 0.1)).unwrap();
        let b = store.add(new_category("B", 1.0, 0.1)).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        let raw = kv
            .raw(&StorageKeys::for_namespace(DEFAULT_NAMESPACE).categories)
            .unwrap();
        let persisted: Vec<CostCenterCategory> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, store.categories());
    }

    #[test]
    fn update_keeps_identity_and_advances_updated_at() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let before = store.categories()[0].clone();

        let updated = store
            .update(
                &before.id,
                CategoryPatch {
                    name: Some("Renamed".to_string()),
                    ..CategoryPatch::default()
                },
            )
            .unwrap()
            .expect("category exists");

        assert_eq!(updated.id, before.id);
        assert_eq!(updated.created_at, before.created_at);
        assert!(updated.updated_at >= before.updated_at);
        assert_eq!(store.category(&before.id).unwrap().name, "Renamed");
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let writes = kv.write_count();
        let snapshot = store.categories().to_vec();

        assert!(store.update("missing", CategoryPatch::default()).unwrap().is_none());
        assert!(!store.delete("missing").unwrap());
        assert!(!store.mark_alert_read("missing").unwrap());
        assert!(!store.dismiss_alert("missing").unwrap());

        assert_eq!(store.categories(), snapshot.as_slice());
        assert_eq!(kv.write_count(), writes);
    }

    #[test]
    fn add_then_delete_restores_list() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let before = sorted_by_id(store.categories().to_vec());

        let added = store.add(new_category("Temporary", 50.0, 5.0)).unwrap();
        assert!(store.delete(&added.id).unwrap());

        assert_eq!(sorted_by_id(store.categories().to_vec()), before);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let before = store.categories().to_vec();

        kv.fail_writes(true);
        assert!(store.add(new_category("Lost", 10.0, 1.0)).is_err());
        assert!(store.delete(&before[0].id).is_err());

        assert_eq!(store.categories(), before.as_slice());
    }

    #[test]
    fn unit_projection_uses_breakdown_entries() {
        let kv = MemoryKv::new();
        let store = seeded(&kv);

        assert_eq!(store.categories_by_unit(ALL_UNITS), store.categories());

        let north = store.categories_by_unit("north");
        for (projected, original) in north.iter().zip(store.categories()) {
            let entry = original.unit_entry("north").unwrap();
            assert_eq!(projected.total_amount, entry.amount);
            assert_eq!(projected.percentage, entry.percentage);
        }

        assert!(store
            .categories_by_unit("east")
            .iter()
            .all(|c| c.total_amount == 0.0 && c.percentage == 0.0));
    }

    #[test]
    fn regeneration_does_not_duplicate_existing_alert() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let top = store.categories()[3].clone();

        // 400 at 45% is a warning-level concentration
        store
            .update(
                &top.id,
                CategoryPatch {
                    percentage: Some(45.0),
                    ..CategoryPatch::default()
                },
            )
            .unwrap();
        let alert_id = AlertKind::HighConcentration.alert_id(Some(&top.id));
        assert!(store.mark_alert_read(&alert_id).unwrap());

        // still concentrated, now critical
        store
            .update(
                &top.id,
                CategoryPatch {
                    percentage: Some(70.0),
                    ..CategoryPatch::default()
                },
            )
            .unwrap();

        let matching: Vec<_> = store.alerts().iter().filter(|a| a.id == alert_id).collect();
        assert_eq!(matching.len(), 1);
        assert!(matching[0].is_read);
    }

    #[test]
    fn dismissed_alert_returns_on_next_change() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let first = store.categories()[0].clone();
        let drift = AlertKind::PercentageDrift.alert_id(None);

        store
            .update(
                &first.id,
                CategoryPatch {
                    percentage: Some(30.0),
                    ..CategoryPatch::default()
                },
            )
            .unwrap();
        assert!(store.dismiss_alert(&drift).unwrap());
        assert!(store.alerts().iter().all(|a| a.id != drift));

        store
            .update(
                &first.id,
                CategoryPatch {
                    total_amount: Some(120.0),
                    ..CategoryPatch::default()
                },
            )
            .unwrap();
        assert!(store.alerts().iter().any(|a| a.id == drift));
    }

    #[test]
    fn refresh_overwrites_read_state() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let first_id = store.alerts()[0].id.clone();
        store.mark_alert_read(&first_id).unwrap();

        let refreshed = store.refresh_alerts().unwrap();

        assert!(refreshed.iter().all(|a| !a.is_read));
        let raw = kv
            .raw(&StorageKeys::for_namespace(DEFAULT_NAMESPACE).alerts)
            .unwrap();
        let persisted: Vec<CostCenterAlert> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), store.alerts().len());
    }

    #[test]
    fn rebalance_clears_percentage_drift() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let first = store.categories()[0].clone();
        store
            .update(
                &first.id,
                CategoryPatch {
                    total_amount: Some(600.0),
                    ..CategoryPatch::default()
                },
            )
            .unwrap();

        let changed = store.rebalance_percentages().unwrap();
        assert_eq!(changed, 4);

        let sum: f64 = store.categories().iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);

        store.refresh_alerts().unwrap();
        assert!(store
            .alerts()
            .iter()
            .all(|a| a.kind != AlertKind::PercentageDrift));
    }

    #[test]
    fn failed_alert_write_still_commits_category_change() {
        let kv = MemoryKv::new();
        let mut store = seeded(&kv);
        let keys = StorageKeys::for_namespace(DEFAULT_NAMESPACE);
        let alerts_before = store.alerts().to_vec();
        kv.fail_writes_to(&keys.alerts);

        let added = store
            .add(new_category("Dominant", 20_000.0, 95.0))
            .expect("category write succeeded");

        assert_eq!(store.categories().len(), 5);
        let persisted: Vec<CostCenterCategory> =
            serde_json::from_str(&kv.raw(&keys.categories).unwrap()).unwrap();
        assert!(persisted.iter().any(|c| c.id == added.id));

        assert_eq!(store.alerts(), alerts_before.as_slice());
        let stored_alerts: Vec<CostCenterAlert> =
            serde_json::from_str(&kv.raw(&keys.alerts).unwrap()).unwrap();
        assert_eq!(stored_alerts, alerts_before);
    }

    #[test]
    fn dismissed_alert_stays_dismissed_after_reload() {
        let kv = MemoryKv::new();
        let dismissed = AlertKind::HighConcentration.alert_id(Some("default-1"));
        {
            let mut store = CategoryStore::load(&kv, StoreConfig::default()).unwrap();
            assert!(store.dismiss_alert(&dismissed).unwrap());
        }

        let reloaded = CategoryStore::load(&kv, StoreConfig::default()).unwrap();

        assert!(reloaded.alerts().iter().all(|a| a.id != dismissed));
        assert!(!reloaded.alerts().is_empty());
    }

    #[test]
    fn load_keeps_stored_alert_list_as_is() {
        let kv = MemoryKv::new();
        let mut store = CategoryStore::load(&kv, StoreConfig::default()).unwrap();
        let ids: Vec<String> = store.alerts().iter().map(|a| a.id.clone()).collect();
        for id in &ids {
            store.dismiss_alert(id).unwrap();
        }
        let writes = kv.write_count();

        let reloaded = CategoryStore::load(&kv, StoreConfig::default()).unwrap();

        assert!(reloaded.alerts().is_empty());
        assert_eq!(kv.write_count(), writes);
    }
}
