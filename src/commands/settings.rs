use crate::analysis::alerts::AlertThresholds;
use crate::commands::db::{data_path, ensure_data_dir};
use crate::store::{StoreConfig, DEFAULT_MONTHLY_GROWTH, DEFAULT_NAMESPACE};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;

const THRESHOLD_KEYS: [&str; 10] = [
    "concentrationWarning",
    "concentrationCritical",
    "lowShare",
    "topThreeWarning",
    "topThreeCritical",
    "minActiveCategories",
    "maxActiveCategories",
    "growthWarning",
    "growthCritical",
    "percentageDriftTolerance",
];

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn get_settings(data_dir: String) -> Result<Value, String> {
    load_settings_from_disk(&data_dir)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn save_settings(data_dir: String, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&data_dir, settings)
}

/// Settings resolved into the typed configuration the store runs with.
pub fn load_store_config(data_dir: &str) -> Result<StoreConfig, String> {
    let settings = load_settings_from_disk(data_dir)?;
    Ok(store_config_from(&settings))
}

pub fn store_config_from(settings: &Value) -> StoreConfig {
    let defaults = AlertThresholds::default();
    let t = settings.get("thresholds").cloned().unwrap_or_else(|| json!({}));
    let num = |key: &str, default: f64| t.get(key).and_then(Value::as_f64).unwrap_or(default);
    let count = |key: &str, default: usize| {
        t.get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(default)
    };

    StoreConfig {
        namespace: settings
            .get("storageNamespace")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string(),
        monthly_growth: settings
            .get("monthlyGrowth")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_MONTHLY_GROWTH),
        thresholds: AlertThresholds {
            concentration_warning: num("concentrationWarning", defaults.concentration_warning),
            concentration_critical: num("concentrationCritical", defaults.concentration_critical),
            low_share: num("lowShare", defaults.low_share),
            top_three_warning: num("topThreeWarning", defaults.top_three_warning),
            top_three_critical: num("topThreeCritical", defaults.top_three_critical),
            min_active_categories: count("minActiveCategories", defaults.min_active_categories),
            max_active_categories: count("maxActiveCategories", defaults.max_active_categories),
            growth_warning: num("growthWarning", defaults.growth_warning),
            growth_critical: num("growthCritical", defaults.growth_critical),
            percentage_drift_tolerance: num(
                "percentageDriftTolerance",
                defaults.percentage_drift_tolerance,
            ),
        },
    }
}

pub fn load_settings_from_disk(data_dir: &str) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)
        .map_err(|e| format!("Failed to create {} directory: {e}", crate::commands::db::DATA_DIR_NAME))?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON, starting from defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(data_dir);

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

fn settings_path(data_dir: &str) -> PathBuf {
    data_path(data_dir).join("settings.json")
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 2 {
        // V1 kept thresholds as top-level keys.
        nest_flat_thresholds(&mut out);
    }

    deep_merge_defaults(&mut out, &default_settings());
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    let t = AlertThresholds::default();
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "storageNamespace": DEFAULT_NAMESPACE,
        "monthlyGrowth": DEFAULT_MONTHLY_GROWTH,
        "thresholds": {
            "concentrationWarning": t.concentration_warning,
            "concentrationCritical": t.concentration_critical,
            "lowShare": t.low_share,
            "topThreeWarning": t.top_three_warning,
            "topThreeCritical": t.top_three_critical,
            "minActiveCategories": t.min_active_categories,
            "maxActiveCategories": t.max_active_categories,
            "growthWarning": t.growth_warning,
            "growthCritical": t.growth_critical,
            "percentageDriftTolerance": t.percentage_drift_tolerance
        }
    })
}

fn nest_flat_thresholds(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    let mut nested = obj
        .get("thresholds")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    for key in THRESHOLD_KEYS {
        if let Some(value) = obj.remove(key) {
            nested.entry(key.to_string()).or_insert(value);
        }
    }

    if !nested.is_empty() {
        obj.insert("thresholds".to_string(), Value::Object(nested));
    }
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    sanitize_namespace(obj);
    clamp_f64(obj, "monthlyGrowth", -100.0, 1000.0, DEFAULT_MONTHLY_GROWTH);

    let defaults = AlertThresholds::default();
    let thresholds = obj
        .entry("thresholds".to_string())
        .or_insert_with(|| json!({}));
    if !thresholds.is_object() {
        *thresholds = json!({});
    }
    let Some(t) = thresholds.as_object_mut() else {
        return;
    };

    clamp_f64(t, "concentrationWarning", 0.0, 100.0, defaults.concentration_warning);
    clamp_f64(t, "concentrationCritical", 0.0, 100.0, defaults.concentration_critical);
    clamp_f64(t, "lowShare", 0.0, 100.0, defaults.low_share);
    clamp_f64(t, "topThreeWarning", 0.0, 100.0, defaults.top_three_warning);
    clamp_f64(t, "topThreeCritical", 0.0, 100.0, defaults.top_three_critical);
    clamp_u64(t, "minActiveCategories", 0, 50, defaults.min_active_categories as u64);
    clamp_u64(t, "maxActiveCategories", 1, 100, defaults.max_active_categories as u64);
    clamp_f64(t, "growthWarning", 0.0, 1000.0, defaults.growth_warning);
    clamp_f64(t, "growthCritical", 0.0, 1000.0, defaults.growth_critical);
    clamp_f64(t, "percentageDriftTolerance", 0.0, 100.0, defaults.percentage_drift_tolerance);

    // A warning level above its critical level would never fire.
    order_pair(t, "concentrationWarning", "concentrationCritical");
    order_pair(t, "topThreeWarning", "topThreeCritical");
    order_pair(t, "growthWarning", "growthCritical");
    order_pair(t, "minActiveCategories", "maxActiveCategories");
}

fn sanitize_namespace(map: &mut Map<String, Value>) {
    let valid = map
        .get("storageNamespace")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|ns| !ns.is_empty() && ns.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string();
    map.insert("storageNamespace".to_string(), json!(valid));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map.get(key).and_then(Value::as_f64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn order_pair(map: &mut Map<String, Value>, low_key: &str, high_key: &str) {
    let (Some(low), Some(high)) = (map.get(low_key).cloned(), map.get(high_key).cloned()) else {
        return;
    };
    let (Some(l), Some(h)) = (low.as_f64(), high.as_f64()) else {
        return;
    };
    if l > h {
        map.insert(low_key.to_string(), high);
        map.insert(high_key.to_string(), low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_flat_v1_thresholds_into_nested_object() {
        let input = json!({
            "schema_version": 1,
            "concentrationWarning": 35,
            "growthCritical": 15,
            "monthlyGrowth": 4.5
        });

        let migrated = migrate_settings(input);

        assert_eq!(migrated["thresholds"]["concentrationWarning"], json!(35.0));
        assert_eq!(migrated["thresholds"]["growthCritical"], json!(15.0));
        assert!(migrated.get("concentrationWarning").is_none());
        assert_eq!(migrated["monthlyGrowth"], json!(4.5));
        assert_eq!(
            migrated
                .get("schema_version")
                .and_then(Value::as_i64)
                .unwrap(),
            SETTINGS_SCHEMA_VERSION
        );
    }

    #[test]
    fn merges_partial_settings_without_losing_existing_values() {
        let mut existing = default_settings();
        merge_settings(&mut existing, &json!({ "thresholds": { "lowShare": 3 } }));
        let migrated = migrate_settings(existing);

        assert_eq!(migrated["thresholds"]["lowShare"], json!(3.0));
        assert_eq!(migrated["thresholds"]["concentrationCritical"], json!(60.0));
        assert_eq!(migrated["storageNamespace"], json!(DEFAULT_NAMESPACE));
    }

    #[test]
    fn sanitizes_out_of_range_and_inverted_values() {
        let migrated = migrate_settings(json!({
            "schema_version": 2,
            "storageNamespace": "bad namespace!",
            "monthlyGrowth": "fast",
            "thresholds": {
                "concentrationWarning": 150,
                "concentrationCritical": 50,
                "minActiveCategories": 12,
                "maxActiveCategories": 4
            }
        }));

        assert_eq!(migrated["storageNamespace"], json!(DEFAULT_NAMESPACE));
        assert_eq!(migrated["monthlyGrowth"], json!(DEFAULT_MONTHLY_GROWTH));
        assert_eq!(migrated["thresholds"]["concentrationWarning"], json!(50.0));
        assert_eq!(migrated["thresholds"]["concentrationCritical"], json!(100.0));
        assert_eq!(migrated["thresholds"]["minActiveCategories"], json!(4));
        assert_eq!(migrated["thresholds"]["maxActiveCategories"], json!(12));
    }

    #[test]
    fn builds_store_config_from_settings() {
        let settings = migrate_settings(json!({
            "storageNamespace": "la-music",
            "monthlyGrowth": 7.0,
            "thresholds": { "maxActiveCategories": 10 }
        }));

        let config = store_config_from(&settings);

        assert_eq!(config.namespace, "la-music");
        assert_eq!(config.monthly_growth, 7.0);
        assert_eq!(config.thresholds.max_active_categories, 10);
        assert_eq!(config.thresholds.low_share, AlertThresholds::default().low_share);
    }
}
