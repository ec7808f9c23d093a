pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;
pub mod store;

#[cfg(feature = "desktop")]
use commands::{
    alerts::{dismiss_alert, list_alerts, mark_alert_read, refresh_alerts},
    categories::{
        add_category, delete_category, get_categories_by_unit, get_cost_center_metrics,
        get_indicators, get_metric_status, list_categories, rebalance_percentages,
        update_category,
    },
    settings::{get_settings, save_settings},
    StoreCache,
};
#[cfg(feature = "desktop")]
use std::sync::{Arc, Mutex};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .manage(Arc::new(Mutex::new(StoreCache::default())))
        .invoke_handler(tauri::generate_handler![
            list_categories,
            add_category,
            update_category,
            delete_category,
            get_cost_center_metrics,
            get_categories_by_unit,
            rebalance_percentages,
            get_indicators,
            get_metric_status,
            list_alerts,
            mark_alert_read,
            dismiss_alert,
            refresh_alerts,
            get_settings,
            save_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
