use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::chrome::{self, TabInfo, TabQueryArgs};

/// The (tab, origin) pair the mirror currently reflects. Equality is what the
/// stale-response guard compares, so it must cover both the tab identity and
/// the origin it had when resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub tab_id: i32,
    /// scheme://host[:port], no trailing slash.
    pub origin: String,
    /// Hostname without the port, for cookie domain comparison.
    pub host: String,
}

pub fn inspectable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Extracts (origin, host) from an absolute http(s) URL.
pub fn parse_origin(url: &str) -> Option<(String, String)> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme != "http" && scheme != "https" {
        return None;
    }
    let authority = rest.split(['/', '?', '#']).next()?;
    if authority.is_empty() {
        return None;
    }
    let host = match authority.rsplit_once(':') {
        Some((h, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => h,
        _ => authority,
    };
    Some((format!("{scheme}://{authority}"), host.to_string()))
}

pub fn context_from_tab(tab: &TabInfo) -> Option<PageContext> {
    let tab_id = tab.id?;
    let url = tab.url.as_deref()?;
    if !inspectable(url) {
        return None;
    }
    let (origin, host) = parse_origin(url)?;
    Some(PageContext {
        tab_id,
        origin,
        host,
    })
}

/// Resolves the context of the active tab. When the active tab is not
/// inspectable (browser-internal pages) and the popup runs in the expanded
/// presentation, falls back to the first inspectable tab among all open tabs.
pub async fn resolve_initial_context(expanded: bool) -> Result<PageContext, String> {
    let args = serde_wasm_bindgen::to_value(&TabQueryArgs {
        active: true,
        current_window: true,
    })
    .map_err(|e| e.to_string())?;
    let tabs_val = chrome::tabs_query(args)
        .await
        .map_err(chrome::js_error_string)?;
    let tabs: Vec<TabInfo> = serde_wasm_bindgen::from_value(tabs_val).map_err(|e| e.to_string())?;
    if let Some(ctx) = tabs.first().and_then(context_from_tab) {
        return Ok(ctx);
    }
    if expanded {
        if let Some((ctx, _)) = list_inspectable_tabs().await?.into_iter().next() {
            return Ok(ctx);
        }
    }
    Err("no usable context: the current tab cannot be inspected".to_string())
}

/// Every open tab whose page can be inspected, with a display title.
pub async fn list_inspectable_tabs() -> Result<Vec<(PageContext, String)>, String> {
    let all: JsValue = js_sys::Object::new().into();
    let tabs_val = chrome::tabs_query(all)
        .await
        .map_err(chrome::js_error_string)?;
    let tabs: Vec<TabInfo> = serde_wasm_bindgen::from_value(tabs_val).map_err(|e| e.to_string())?;
    Ok(tabs
        .iter()
        .filter_map(|tab| {
            let ctx = context_from_tab(tab)?;
            let title = tab
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| ctx.origin.clone());
            Some((ctx, title))
        })
        .collect())
}

/// Re-resolves the origin of the chosen tab. The caller rebinds the mirror
/// and triggers a full reload; nothing from the previous context survives.
pub async fn switch_context(tab_id: i32) -> Result<PageContext, String> {
    let tab_val = chrome::tabs_get(tab_id)
        .await
        .map_err(chrome::js_error_string)?;
    let tab: TabInfo = serde_wasm_bindgen::from_value(tab_val).map_err(|e| e.to_string())?;
    context_from_tab(&tab).ok_or_else(|| "selected tab cannot be inspected".to_string())
}
