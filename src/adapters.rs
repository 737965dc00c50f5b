use std::collections::BTreeMap;

use crate::chrome::{self, CookieRemoveArgs, CookieUrlArgs};
use crate::context::PageContext;
use crate::model::{shape_cookie_write, Cookie, KvKind};

/// Uniform surface over the two origin-scoped key-value stores. Failure is a
/// plain message string; callers only touch the mirror after success.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn load_all(
        &self,
        ctx: &PageContext,
        kind: KvKind,
    ) -> Result<BTreeMap<String, String>, String>;
    async fn set(
        &self,
        ctx: &PageContext,
        kind: KvKind,
        key: &str,
        value: &str,
    ) -> Result<(), String>;
    async fn remove(&self, ctx: &PageContext, kind: KvKind, key: &str) -> Result<(), String>;
}

#[allow(async_fn_in_trait)]
pub trait CookieStore {
    async fn load_all(&self, ctx: &PageContext) -> Result<Vec<Cookie>, String>;
    async fn set(&self, ctx: &PageContext, cookie: &Cookie) -> Result<(), String>;
    /// Removes the cookie the store resolves for `name` under the origin's
    /// default URL. When several cookies share a name across domain/path
    /// variants, only that one is removed.
    async fn remove(&self, ctx: &PageContext, name: &str) -> Result<(), String>;
}

/// localStorage/sessionStorage through script injection into the inspected
/// tab. No quota handling; a quota-exceeded write surfaces as an ordinary
/// failure from the runtime.
pub struct ChromeKvStore;

impl KeyValueStore for ChromeKvStore {
    async fn load_all(
        &self,
        ctx: &PageContext,
        kind: KvKind,
    ) -> Result<BTreeMap<String, String>, String> {
        let val = chrome::kv_get_all(ctx.tab_id, kind.as_str())
            .await
            .map_err(chrome::js_error_string)?;
        if val.is_null() || val.is_undefined() {
            return Ok(BTreeMap::new());
        }
        serde_wasm_bindgen::from_value(val).map_err(|e| e.to_string())
    }

    async fn set(
        &self,
        ctx: &PageContext,
        kind: KvKind,
        key: &str,
        value: &str,
    ) -> Result<(), String> {
        chrome::kv_set(ctx.tab_id, kind.as_str(), key, value)
            .await
            .map(|_| ())
            .map_err(chrome::js_error_string)
    }

    async fn remove(&self, ctx: &PageContext, kind: KvKind, key: &str) -> Result<(), String> {
        chrome::kv_remove(ctx.tab_id, kind.as_str(), key)
            .await
            .map(|_| ())
            .map_err(chrome::js_error_string)
    }
}

pub struct ChromeCookieStore;

fn default_url(ctx: &PageContext) -> String {
    format!("{}/", ctx.origin)
}

impl CookieStore for ChromeCookieStore {
    async fn load_all(&self, ctx: &PageContext) -> Result<Vec<Cookie>, String> {
        let url = default_url(ctx);
        let args = serde_wasm_bindgen::to_value(&CookieUrlArgs { url: &url })
            .map_err(|e| e.to_string())?;
        let val = chrome::cookies_get_all(args)
            .await
            .map_err(chrome::js_error_string)?;
        serde_wasm_bindgen::from_value(val).map_err(|e| e.to_string())
    }

    async fn set(&self, ctx: &PageContext, cookie: &Cookie) -> Result<(), String> {
        let write = shape_cookie_write(&ctx.origin, &ctx.host, cookie);
        let details = serde_wasm_bindgen::to_value(&write).map_err(|e| e.to_string())?;
        let result = chrome::cookies_set(details)
            .await
            .map_err(chrome::js_error_string)?;
        // chrome.cookies.set resolves with null when the write is rejected.
        if result.is_null() {
            return Err(format!("cookie store rejected write for {}", cookie.name));
        }
        Ok(())
    }

    async fn remove(&self, ctx: &PageContext, name: &str) -> Result<(), String> {
        let url = default_url(ctx);
        let args = serde_wasm_bindgen::to_value(&CookieRemoveArgs { url: &url, name })
            .map_err(|e| e.to_string())?;
        let result = chrome::cookies_remove(args)
            .await
            .map_err(chrome::js_error_string)?;
        if result.is_null() {
            return Err(format!("no cookie named {name} to remove"));
        }
        Ok(())
    }
}
