//! Bindings to the promise-returning chrome.* extension APIs the popup uses.
//! Argument objects are built from serde structs via serde-wasm-bindgen.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    pub async fn tabs_query(query_info: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = get)]
    pub async fn tabs_get(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "cookies"], js_name = getAll)]
    pub async fn cookies_get_all(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "cookies"], js_name = set)]
    pub async fn cookies_set(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "cookies"], js_name = remove)]
    pub async fn cookies_remove(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    pub async fn storage_local_get(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    pub async fn storage_local_set(items: JsValue) -> Result<JsValue, JsValue>;
}

// chrome.scripting.executeScript takes a function object, which the MV3 CSP
// will not let us synthesize from wasm, so the storage accessors live in a
// bundled snippet.
#[wasm_bindgen(module = "/src/page_probe.js")]
extern "C" {
    #[wasm_bindgen(catch, js_name = kvGetAll)]
    pub async fn kv_get_all(tab_id: i32, kind: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = kvSet)]
    pub async fn kv_set(tab_id: i32, kind: &str, key: &str, value: &str)
        -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = kvRemove)]
    pub async fn kv_remove(tab_id: i32, kind: &str, key: &str) -> Result<JsValue, JsValue>;
}

#[derive(Serialize)]
pub struct TabQueryArgs {
    pub active: bool,
    #[serde(rename = "currentWindow")]
    pub current_window: bool,
}

#[derive(Serialize)]
pub struct CookieUrlArgs<'a> {
    pub url: &'a str,
}

#[derive(Serialize)]
pub struct CookieRemoveArgs<'a> {
    pub url: &'a str,
    pub name: &'a str,
}

#[derive(Deserialize)]
pub struct TabInfo {
    pub id: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

pub fn js_error_string(err: JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"))
}

pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

pub fn now_iso() -> String {
    js_sys::Date::new_0()
        .to_iso_string()
        .as_string()
        .unwrap_or_default()
}
