use crate::commands::{with_store, SharedStores};
use crate::models::alert::CostCenterAlert;
use serde_json::{json, Value};

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn list_alerts(
    data_dir: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Vec<CostCenterAlert>, String> {
    list_alerts_internal(&data_dir, stores.inner())
}

pub fn list_alerts_internal(
    data_dir: &str,
    stores: &SharedStores,
) -> Result<Vec<CostCenterAlert>, String> {
    with_store(stores, data_dir, |store| Ok(store.alerts().to_vec()))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn mark_alert_read(
    data_dir: String,
    alert_id: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Value, String> {
    mark_alert_read_internal(&data_dir, &alert_id, stores.inner())
}

pub fn mark_alert_read_internal(
    data_dir: &str,
    alert_id: &str,
    stores: &SharedStores,
) -> Result<Value, String> {
    let found = with_store(stores, data_dir, |store| {
        store
            .mark_alert_read(alert_id)
            .map_err(|e| format!("Update error: {e}"))
    })?;

    let status = if found { "read" } else { "not_found" };
    Ok(json!({ "status": status, "id": alert_id }))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn dismiss_alert(
    data_dir: String,
    alert_id: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Value, String> {
    dismiss_alert_internal(&data_dir, &alert_id, stores.inner())
}

pub fn dismiss_alert_internal(
    data_dir: &str,
    alert_id: &str,
    stores: &SharedStores,
) -> Result<Value, String> {
    let found = with_store(stores, data_dir, |store| {
        store
            .dismiss_alert(alert_id)
            .map_err(|e| format!("Delete error: {e}"))
    })?;

    let status = if found { "dismissed" } else { "not_found" };
    Ok(json!({ "status": status, "id": alert_id }))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn refresh_alerts(
    data_dir: String,
    stores: tauri::State<'_, SharedStores>,
) -> Result<Vec<CostCenterAlert>, String> {
    refresh_alerts_internal(&data_dir, stores.inner())
}

pub fn refresh_alerts_internal(
    data_dir: &str,
    stores: &SharedStores,
) -> Result<Vec<CostCenterAlert>, String> {
    with_store(stores, data_dir, |store| {
        store
            .refresh_alerts()
            .map(|alerts| alerts.to_vec())
            .map_err(|e| format!("Update error: {e}"))
    })
}
