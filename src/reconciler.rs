use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapters::{CookieStore, KeyValueStore};
use crate::context::PageContext;
use crate::mirror::{LoadedStores, MirrorUpdate, StorageMirror};
use crate::model::{canonicalize_value, Cookie, KvKind, StorageKind};

/// Orchestrates adapter calls and produces `MirrorUpdate`s for the caller to
/// apply. Generic over the adapter contracts so tests can inject in-memory
/// stores.
pub struct Reconciler<K, C> {
    kv: K,
    cookies: C,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    KeyValue {
        kind: KvKind,
        key: String,
        value: String,
    },
    Cookie(Cookie),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportMode {
    Merge,
    Replace,
}

/// Top level of the interchange file. `exportedAt` and `domain` are written
/// on export and ignored here.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImportPayload {
    #[serde(default, rename = "localStorage")]
    pub local: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "sessionStorage")]
    pub session: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub cookies: Option<Vec<Cookie>>,
}

/// Rejects malformed payloads before any store is touched.
pub fn parse_import(text: &str) -> Result<ImportPayload, String> {
    serde_json::from_str(text).map_err(|e| format!("invalid import payload: {e}"))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub applied: usize,
    pub failed_writes: usize,
    pub failed_deletes: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportSnapshot {
    #[serde(rename = "localStorage", skip_serializing_if = "Option::is_none")]
    pub local: Option<BTreeMap<String, String>>,
    #[serde(rename = "sessionStorage", skip_serializing_if = "Option::is_none")]
    pub session: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,
    #[serde(rename = "exportedAt")]
    pub exported_at: String,
    pub domain: String,
}

/// Pure function of the mirror: selected kinds only, cookie domains
/// dot-stripped (symmetric with the normalization applied on write). The
/// caller supplies the clock reading.
pub fn export_snapshot(
    mirror: &StorageMirror,
    kinds: &[StorageKind],
    exported_at: String,
) -> ExportSnapshot {
    let wants = |kind| kinds.contains(&kind);
    ExportSnapshot {
        local: wants(StorageKind::Local).then(|| mirror.kv(KvKind::Local).clone()),
        session: wants(StorageKind::Session).then(|| mirror.kv(KvKind::Session).clone()),
        cookies: wants(StorageKind::Cookies).then(|| {
            mirror
                .cookies()
                .iter()
                .map(Cookie::normalized_for_export)
                .collect()
        }),
        exported_at,
        domain: mirror
            .context()
            .map(|c| c.host.clone())
            .unwrap_or_default(),
    }
}

impl<K: KeyValueStore, C: CookieStore> Reconciler<K, C> {
    pub fn new(kv: K, cookies: C) -> Self {
        Reconciler { kv, cookies }
    }

    /// Loads all three stores concurrently. Each failure degrades that one
    /// collection to empty and is recorded; one store failing never blocks
    /// the other two.
    pub async fn load_all(&self, ctx: &PageContext) -> LoadedStores {
        let (local, session, cookies) = futures::join!(
            self.kv.load_all(ctx, KvKind::Local),
            self.kv.load_all(ctx, KvKind::Session),
            self.cookies.load_all(ctx),
        );

        let mut failed = Vec::new();
        let local = local.unwrap_or_else(|e| {
            log::warn!("local storage load failed for {}: {e}", ctx.origin);
            failed.push(StorageKind::Local);
            BTreeMap::new()
        });
        let session = session.unwrap_or_else(|e| {
            log::warn!("session storage load failed for {}: {e}", ctx.origin);
            failed.push(StorageKind::Session);
            BTreeMap::new()
        });
        let cookies = cookies.unwrap_or_else(|e| {
            log::warn!("cookie load failed for {}: {e}", ctx.origin);
            failed.push(StorageKind::Cookies);
            Vec::new()
        });

        LoadedStores {
            context: ctx.clone(),
            local,
            session,
            cookies,
            failed,
        }
    }

    /// Canonicalizes well-formed JSON object/array values, writes through the
    /// adapter, and on success returns the mirror update: incremental for
    /// key-value kinds, a full cookie reload for cookies (a single set can
    /// change cookie identity, e.g. the domain, so incremental update is
    /// unsafe there).
    pub async fn apply_edit(&self, ctx: &PageContext, edit: Edit) -> Result<MirrorUpdate, String> {
        match edit {
            Edit::KeyValue { kind, key, value } => {
                let value = canonicalize_value(&value);
                self.kv.set(ctx, kind, &key, &value).await?;
                Ok(MirrorUpdate::Upsert {
                    context: ctx.clone(),
                    kind,
                    key,
                    value,
                })
            }
            Edit::Cookie(mut cookie) => {
                cookie.value = canonicalize_value(&cookie.value);
                self.cookies.set(ctx, &cookie).await?;
                let cookies = self.cookies.load_all(ctx).await?;
                Ok(MirrorUpdate::ReplaceCookies {
                    context: ctx.clone(),
                    cookies,
                })
            }
        }
    }

    /// Caller is responsible for confirming with the user first. On failure
    /// the mirror stays untouched (no update is produced).
    pub async fn apply_delete(
        &self,
        ctx: &PageContext,
        kind: StorageKind,
        key: &str,
    ) -> Result<MirrorUpdate, String> {
        match kind.kv() {
            Some(kv) => self.kv.remove(ctx, kv, key).await?,
            None => self.cookies.remove(ctx, key).await?,
        }
        Ok(MirrorUpdate::Evict {
            context: ctx.clone(),
            kind,
            key: key.to_string(),
        })
    }

    /// Applies an already-parsed payload. Replace mode deletes every
    /// currently-mirrored entry of an imported kind before writing; delete
    /// failures are tolerated and counted, never blocking. Writes run
    /// sequentially within a kind for a deterministic applied count. No
    /// rollback: partial import is an accepted outcome, and the caller must
    /// reload the mirror afterwards rather than trusting incremental updates.
    pub async fn import_bulk(
        &self,
        ctx: &PageContext,
        mirror: &StorageMirror,
        payload: &ImportPayload,
        mode: ImportMode,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for kind in [KvKind::Local, KvKind::Session] {
            let entries = match kind {
                KvKind::Local => payload.local.as_ref(),
                KvKind::Session => payload.session.as_ref(),
            };
            let Some(entries) = entries else { continue };

            if mode == ImportMode::Replace {
                for key in mirror.kv(kind).keys() {
                    if let Err(e) = self.kv.remove(ctx, kind, key).await {
                        log::warn!("import: failed to clear {key} from {}: {e}", kind.as_str());
                        report.failed_deletes += 1;
                    }
                }
            }
            for (key, value) in entries {
                match self.kv.set(ctx, kind, key, value).await {
                    Ok(()) => report.applied += 1,
                    Err(e) => {
                        log::warn!("import: failed to write {key} to {}: {e}", kind.as_str());
                        report.failed_writes += 1;
                    }
                }
            }
        }

        if let Some(cookies) = payload.cookies.as_ref() {
            if mode == ImportMode::Replace {
                for cookie in mirror.cookies() {
                    if let Err(e) = self.cookies.remove(ctx, &cookie.name).await {
                        log::warn!("import: failed to clear cookie {}: {e}", cookie.name);
                        report.failed_deletes += 1;
                    }
                }
            }
            for cookie in cookies {
                match self.cookies.set(ctx, cookie).await {
                    Ok(()) => report.applied += 1,
                    Err(e) => {
                        log::warn!("import: failed to write cookie {}: {e}", cookie.name);
                        report.failed_writes += 1;
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::StorageMirror;
    use crate::model::SameSite;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};

    fn ctx() -> PageContext {
        PageContext {
            tab_id: 7,
            origin: "https://example.com".to_string(),
            host: "example.com".to_string(),
        }
    }

    fn cookie(name: &str, value: &str, domain: Option<&str>) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.map(str::to_string),
            path: "/".to_string(),
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiration_date: None,
        }
    }

    #[derive(Default)]
    struct FakeKv {
        local: RefCell<BTreeMap<String, String>>,
        session: RefCell<BTreeMap<String, String>>,
        fail_local_load: Cell<bool>,
        fail_set_keys: RefCell<Vec<String>>,
    }

    impl FakeKv {
        fn store(&self, kind: KvKind) -> &RefCell<BTreeMap<String, String>> {
            match kind {
                KvKind::Local => &self.local,
                KvKind::Session => &self.session,
            }
        }

        fn seed(&self, kind: KvKind, pairs: &[(&str, &str)]) {
            let mut map = self.store(kind).borrow_mut();
            for (k, v) in pairs {
                map.insert(k.to_string(), v.to_string());
            }
        }
    }

    impl KeyValueStore for FakeKv {
        async fn load_all(
            &self,
            _ctx: &PageContext,
            kind: KvKind,
        ) -> Result<BTreeMap<String, String>, String> {
            if kind == KvKind::Local && self.fail_local_load.get() {
                return Err("execution context gone".to_string());
            }
            Ok(self.store(kind).borrow().clone())
        }

        async fn set(
            &self,
            _ctx: &PageContext,
            kind: KvKind,
            key: &str,
            value: &str,
        ) -> Result<(), String> {
            if self.fail_set_keys.borrow().iter().any(|k| k == key) {
                return Err("quota exceeded".to_string());
            }
            self.store(kind)
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, _ctx: &PageContext, kind: KvKind, key: &str) -> Result<(), String> {
            match self.store(kind).borrow_mut().remove(key) {
                Some(_) => Ok(()),
                None => Err(format!("no such key {key}")),
            }
        }
    }

    #[derive(Default)]
    struct FakeCookies {
        jar: RefCell<Vec<Cookie>>,
        fail_load: Cell<bool>,
        fail_set_names: RefCell<Vec<String>>,
    }

    impl CookieStore for FakeCookies {
        async fn load_all(&self, _ctx: &PageContext) -> Result<Vec<Cookie>, String> {
            if self.fail_load.get() {
                return Err("cookie store unavailable".to_string());
            }
            Ok(self.jar.borrow().clone())
        }

        async fn set(&self, _ctx: &PageContext, cookie: &Cookie) -> Result<(), String> {
            if self.fail_set_names.borrow().iter().any(|n| n == &cookie.name) {
                return Err("rejected".to_string());
            }
            let mut jar = self.jar.borrow_mut();
            if let Some(existing) = jar.iter_mut().find(|c| c.name == cookie.name) {
                *existing = cookie.clone();
            } else {
                jar.push(cookie.clone());
            }
            Ok(())
        }

        async fn remove(&self, _ctx: &PageContext, name: &str) -> Result<(), String> {
            let mut jar = self.jar.borrow_mut();
            match jar.iter().position(|c| c.name == name) {
                Some(pos) => {
                    jar.remove(pos);
                    Ok(())
                }
                None => Err(format!("no cookie named {name}")),
            }
        }
    }

    fn mirror_with(
        context: &PageContext,
        local: &[(&str, &str)],
        cookies: Vec<Cookie>,
    ) -> StorageMirror {
        let mut mirror = StorageMirror::default();
        mirror.rebind(context.clone());
        mirror.apply(MirrorUpdate::Adopt(LoadedStores {
            context: context.clone(),
            local: local
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            session: BTreeMap::new(),
            cookies,
            failed: Vec::new(),
        }));
        mirror
    }

    #[test]
    fn one_failed_store_degrades_alone() {
        let kv = FakeKv::default();
        kv.fail_local_load.set(true);
        kv.seed(KvKind::Session, &[("s", "1")]);
        let cookies = FakeCookies::default();
        cookies.jar.borrow_mut().push(cookie("sid", "abc", None));

        let recon = Reconciler::new(kv, cookies);
        let loaded = block_on(recon.load_all(&ctx()));

        assert!(loaded.local.is_empty());
        assert_eq!(loaded.session.len(), 1);
        assert_eq!(loaded.cookies.len(), 1);
        assert_eq!(loaded.failed, vec![StorageKind::Local]);
    }

    #[test]
    fn kv_edit_canonicalizes_json_and_round_trips() {
        let recon = Reconciler::new(FakeKv::default(), FakeCookies::default());
        let context = ctx();

        let update = block_on(recon.apply_edit(
            &context,
            Edit::KeyValue {
                kind: KvKind::Local,
                key: "prefs".to_string(),
                value: "{ \"a\" : 1 }".to_string(),
            },
        ))
        .unwrap();
        match &update {
            MirrorUpdate::Upsert { value, .. } => assert_eq!(value, "{\"a\":1}"),
            other => panic!("expected upsert, got {other:?}"),
        }

        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.local.get("prefs").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn non_json_kv_edit_round_trips_byte_identical() {
        let recon = Reconciler::new(FakeKv::default(), FakeCookies::default());
        let context = ctx();
        let raw = "{almost json / 42 true";

        block_on(recon.apply_edit(
            &context,
            Edit::KeyValue {
                kind: KvKind::Session,
                key: "k".to_string(),
                value: raw.to_string(),
            },
        ))
        .unwrap();

        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.session.get("k").unwrap(), raw);
    }

    #[test]
    fn cookie_edit_triggers_full_cookie_reload() {
        let cookies = FakeCookies::default();
        cookies.jar.borrow_mut().push(cookie("other", "1", None));
        let recon = Reconciler::new(FakeKv::default(), cookies);
        let context = ctx();

        let update = block_on(recon.apply_edit(
            &context,
            Edit::Cookie(cookie("sid", "fresh", None)),
        ))
        .unwrap();
        match update {
            MirrorUpdate::ReplaceCookies { cookies, .. } => {
                assert_eq!(cookies.len(), 2);
                assert!(cookies.iter().any(|c| c.name == "sid" && c.value == "fresh"));
            }
            other => panic!("expected cookie reload, got {other:?}"),
        }
    }

    #[test]
    fn failed_edit_produces_no_mirror_update() {
        let kv = FakeKv::default();
        kv.fail_set_keys.borrow_mut().push("locked".to_string());
        let recon = Reconciler::new(kv, FakeCookies::default());

        let result = block_on(recon.apply_edit(
            &ctx(),
            Edit::KeyValue {
                kind: KvKind::Local,
                key: "locked".to_string(),
                value: "v".to_string(),
            },
        ));
        assert!(result.is_err());
    }

    #[test]
    fn delete_failure_leaves_mirror_untouched() {
        let recon = Reconciler::new(FakeKv::default(), FakeCookies::default());
        let result = block_on(recon.apply_delete(&ctx(), StorageKind::Local, "absent"));
        assert!(result.is_err());
    }

    #[test]
    fn import_merge_overlays_and_replace_clears_first() {
        let context = ctx();
        let payload = parse_import("{\"localStorage\":{\"b\":\"2\"}}").unwrap();

        // Merge keeps the existing entry.
        let kv = FakeKv::default();
        kv.seed(KvKind::Local, &[("a", "1")]);
        let mirror = mirror_with(&context, &[("a", "1")], Vec::new());
        let recon = Reconciler::new(kv, FakeCookies::default());
        let report = block_on(recon.import_bulk(&context, &mirror, &payload, ImportMode::Merge));
        assert_eq!(report.applied, 1);
        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.local.len(), 2);
        assert_eq!(loaded.local.get("a").unwrap(), "1");
        assert_eq!(loaded.local.get("b").unwrap(), "2");

        // Replace deletes the mirrored entries before writing.
        let kv = FakeKv::default();
        kv.seed(KvKind::Local, &[("a", "1")]);
        let mirror = mirror_with(&context, &[("a", "1")], Vec::new());
        let recon = Reconciler::new(kv, FakeCookies::default());
        let report = block_on(recon.import_bulk(&context, &mirror, &payload, ImportMode::Replace));
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed_deletes, 0);
        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.local.len(), 1);
        assert_eq!(loaded.local.get("b").unwrap(), "2");
    }

    #[test]
    fn replace_tolerates_delete_failures_and_keeps_writing() {
        let context = ctx();
        // Mirror believes a key exists that the store no longer has, so the
        // replace-mode delete fails; the write must still go through.
        let mirror = mirror_with(&context, &[("ghost", "1")], Vec::new());
        let recon = Reconciler::new(FakeKv::default(), FakeCookies::default());
        let payload = parse_import("{\"localStorage\":{\"b\":\"2\"}}").unwrap();

        let report = block_on(recon.import_bulk(&context, &mirror, &payload, ImportMode::Replace));
        assert_eq!(report.failed_deletes, 1);
        assert_eq!(report.applied, 1);
        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.local.get("b").unwrap(), "2");
    }

    #[test]
    fn partial_import_counts_failures_without_rollback() {
        let context = ctx();
        let kv = FakeKv::default();
        kv.fail_set_keys.borrow_mut().push("bad".to_string());
        let mirror = mirror_with(&context, &[], Vec::new());
        let recon = Reconciler::new(kv, FakeCookies::default());
        let payload =
            parse_import("{\"localStorage\":{\"bad\":\"x\",\"good\":\"y\"}}").unwrap();

        let report = block_on(recon.import_bulk(&context, &mirror, &payload, ImportMode::Merge));
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed_writes, 1);
        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.local.get("good").unwrap(), "y");
        assert!(!loaded.local.contains_key("bad"));
    }

    #[test]
    fn malformed_payload_is_rejected_up_front() {
        assert!(parse_import("{not json").is_err());
        assert!(parse_import("{\"cookies\":{\"not\":\"an array\"}}").is_err());
        // Informational export fields are ignored on import.
        let payload =
            parse_import("{\"exportedAt\":\"2026-01-01T00:00:00Z\",\"domain\":\"x\"}").unwrap();
        assert!(payload.local.is_none());
        assert!(payload.session.is_none());
        assert!(payload.cookies.is_none());
    }

    #[test]
    fn export_then_replace_import_reproduces_kv_exactly() {
        let context = ctx();
        let mirror = mirror_with(
            &context,
            &[("a", "1"), ("b", "{\"n\":2}")],
            vec![cookie("sid", "abc", Some(".example.com"))],
        );

        let snapshot = export_snapshot(
            &mirror,
            &StorageKind::ALL,
            "2026-08-23T00:00:00Z".to_string(),
        );
        assert_eq!(snapshot.domain, "example.com");
        let text = serde_json::to_string(&snapshot).unwrap();

        let payload = parse_import(&text).unwrap();
        let recon = Reconciler::new(FakeKv::default(), FakeCookies::default());
        let empty = mirror_with(&context, &[], Vec::new());
        block_on(recon.import_bulk(&context, &empty, &payload, ImportMode::Replace));

        let loaded = block_on(recon.load_all(&context));
        assert_eq!(loaded.local, *mirror.kv(KvKind::Local));
        // Cookie domains come back dot-stripped; re-exporting is idempotent.
        assert_eq!(loaded.cookies[0].domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn export_includes_only_requested_kinds() {
        let context = ctx();
        let mirror = mirror_with(&context, &[("a", "1")], vec![cookie("sid", "x", None)]);
        let snapshot = export_snapshot(
            &mirror,
            &[StorageKind::Local],
            "2026-08-23T00:00:00Z".to_string(),
        );
        assert!(snapshot.local.is_some());
        assert!(snapshot.session.is_none());
        assert!(snapshot.cookies.is_none());

        let text = serde_json::to_string(&snapshot).unwrap();
        assert!(!text.contains("sessionStorage"));
        assert!(!text.contains("cookies"));
        assert!(text.contains("exportedAt"));
    }
}
