use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::chrome;
use crate::model::StorageKind;

pub const UI_STATE_KEY: &str = "sitestash.ui-state";
pub const THEME_KEY: &str = "sitestash.theme";

/// Snapshot cadence while the popup is open, plus one flush on pagehide.
/// A forced termination loses at most one period's worth of UI state.
pub const SAVE_PERIOD_MS: u64 = 5_000;
/// Snapshots older than this are treated as stale and ignored on restore.
pub const STALE_AFTER_MS: f64 = 60.0 * 60.0 * 1000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub category: StorageKind,
    pub search: String,
    pub theme: String,
    pub saved_at_ms: f64,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            category: StorageKind::Local,
            search: String::new(),
            theme: "dark".to_string(),
            saved_at_ms: 0.0,
        }
    }
}

pub fn is_fresh(saved_at_ms: f64, now_ms: f64) -> bool {
    now_ms - saved_at_ms <= STALE_AFTER_MS
}

fn single_entry(key: &str, value: &str) -> Result<JsValue, String> {
    let items = js_sys::Object::new();
    js_sys::Reflect::set(&items, &JsValue::from_str(key), &JsValue::from_str(value))
        .map_err(chrome::js_error_string)?;
    Ok(items.into())
}

async fn read_entry(key: &str) -> Option<String> {
    let result = chrome::storage_local_get(key).await.ok()?;
    js_sys::Reflect::get(&result, &JsValue::from_str(key))
        .ok()?
        .as_string()
}

/// Fire-and-forget: failures are logged and never block the UI.
pub async fn save(state: &UiState) {
    let json = match serde_json::to_string(state) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("ui state not serializable: {e}");
            return;
        }
    };
    let items = match single_entry(UI_STATE_KEY, &json) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("ui state save failed: {e}");
            return;
        }
    };
    if let Err(e) = chrome::storage_local_set(items).await {
        log::warn!("ui state save failed: {}", chrome::js_error_string(e));
    }
}

/// Reads the last snapshot; `None` when absent, unreadable, or older than
/// the freshness window (the caller keeps its defaults).
pub async fn restore(now_ms: f64) -> Option<UiState> {
    let json = read_entry(UI_STATE_KEY).await?;
    let state: UiState = serde_json::from_str(&json).ok()?;
    if !is_fresh(state.saved_at_ms, now_ms) {
        log::debug!("ignoring stale ui state snapshot");
        return None;
    }
    Some(state)
}

pub async fn save_theme(theme: &str) {
    let items = match single_entry(THEME_KEY, theme) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("theme save failed: {e}");
            return;
        }
    };
    if let Err(e) = chrome::storage_local_set(items).await {
        log::warn!("theme save failed: {}", chrome::js_error_string(e));
    }
}

pub async fn load_theme() -> Option<String> {
    read_entry(THEME_KEY).await
}
