use crate::commands::{with_store, SharedStores};
use crate::models::category::{CategoryPatch, CostCenterCategory, NewCategory};
use crate::models::metrics::{
    CostCenterMetrics, IndicatorReport, IndicatorStatus, IndicatorType, MetricType,
};
use serde_json::{json, Value};

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn list_categories(
    data_dir: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Vec<CostCenterCategory>, String> {
    list_categories_internal(&data_dir, stores.inner())
}

pub fn list_categories_internal(
    data_dir: &str,
    stores: &SharedStores,
) -> Result<Vec<CostCenterCategory>, String> {
    with_store(stores, data_dir, |store| Ok(store.categories().to_vec()))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn add_category(
    data_dir: String,
    category: NewCategory,
    stores: tauri::State<'_, SharedStores>,
) -> Result<CostCenterCategory, String> {
    add_category_internal(&data_dir, category, stores.inner())
}

pub fn add_category_internal(
    data_dir: &str,
    category: NewCategory,
    stores: &SharedStores,
) -> Result<CostCenterCategory, String> {
    if category.total_amount < 0.0 {
        return Err("totalAmount must not be negative".to_string());
    }

    with_store(stores, data_dir, |store| {
        store.add(category).map_err(|e| format!("Insert error: {e}"))
    })
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn update_category(
    data_dir: String,
    id: String,
    patch: CategoryPatch,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Option<CostCenterCategory>, String> {
    update_category_internal(&data_dir, &id, patch, stores.inner())
}

pub fn update_category_internal(
    data_dir: &str,
    id: &str,
    patch: CategoryPatch,
    stores: &SharedStores,
) -> Result<Option<CostCenterCategory>, String> {
    if patch.total_amount.is_some_and(|amount| amount < 0.0) {
        return Err("totalAmount must not be negative".to_string());
    }

    with_store(stores, data_dir, |store| {
        store.update(id, patch).map_err(|e| format!("Update error: {e}"))
    })
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn delete_category(
    data_dir: String,
    id: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Value, String> {
    delete_category_internal(&data_dir, &id, stores.inner())
}

pub fn delete_category_internal(
    data_dir: &str,
    id: &str,
    stores: &SharedStores,
) -> Result<Value, String> {
    let deleted = with_store(stores, data_dir, |store| {
        store.delete(id).map_err(|e| format!("Delete error: {e}"))
    })?;

    let status = if deleted { "deleted" } else { "not_found" };
    Ok(json!({ "status": status, "id": id }))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_cost_center_metrics(
    data_dir: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<CostCenterMetrics, String> {
    get_cost_center_metrics_internal(&data_dir, stores.inner())
}

pub fn get_cost_center_metrics_internal(
    data_dir: &str,
    stores: &SharedStores,
) -> Result<CostCenterMetrics, String> {
    with_store(stores, data_dir, |store| Ok(store.metrics()))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_categories_by_unit(
    data_dir: String,
    unit_id: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Vec<CostCenterCategory>, String> {
    get_categories_by_unit_internal(&data_dir, &unit_id, stores.inner())
}

pub fn get_categories_by_unit_internal(
    data_dir: &str,
    unit_id: &str,
    stores: &SharedStores,
) -> Result<Vec<CostCenterCategory>, String> {
    with_store(stores, data_dir, |store| Ok(store.categories_by_unit(unit_id)))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn rebalance_percentages(
    data_dir: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Value, String> {
    rebalance_percentages_internal(&data_dir, stores.inner())
}

pub fn rebalance_percentages_internal(
    data_dir: &str,
    stores: &SharedStores,
) -> Result<Value, String> {
    let changed = with_store(stores, data_dir, |store| {
        store
            .rebalance_percentages()
            .map_err(|e| format!("Update error: {e}"))
    })?;
    Ok(json!({ "status": "rebalanced", "changed": changed }))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_indicators(
    data_dir: String,
    indicator: IndicatorType,
    stores: tauri::State<'_, SharedStores>,
) -> Result<IndicatorReport, String> {
    get_indicators_internal(&data_dir, indicator, stores.inner())
}

pub fn get_indicators_internal(
    data_dir: &str,
    indicator: IndicatorType,
    stores: &SharedStores,
) -> Result<IndicatorReport, String> {
    with_store(stores, data_dir, |store| Ok(store.indicator(indicator)))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_metric_status(
    data_dir: String,
    metric: MetricType,
    stores: tauri::State<'_, SharedStores>,
) -> Result<IndicatorStatus, String> {
    get_metric_status_internal(&data_dir, metric, stores.inner())
}

pub fn get_metric_status_internal(
    data_dir: &str,
    metric: MetricType,
    stores: &SharedStores,
) -> Result<IndicatorStatus, String> {
    with_store(stores, data_dir, |store| Ok(store.metric_status(metric)))
}
