use std::collections::BTreeMap;

use crate::context::PageContext;
use crate::model::{Cookie, KvKind, ShapedValue, StorageKind};

/// One context's worth of loaded store contents, tagged with the context the
/// load was issued for so a response that arrives after a context switch can
/// be rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedStores {
    pub context: PageContext,
    pub local: BTreeMap<String, String>,
    pub session: BTreeMap<String, String>,
    pub cookies: Vec<Cookie>,
    /// Kinds whose load failed and degraded to empty.
    pub failed: Vec<StorageKind>,
}

/// The only way mirror contents change. Every variant carries its originating
/// context; `StorageMirror::apply` drops updates whose context no longer
/// matches the bound one.
#[derive(Clone, Debug, PartialEq)]
pub enum MirrorUpdate {
    Adopt(LoadedStores),
    Upsert {
        context: PageContext,
        kind: KvKind,
        key: String,
        value: String,
    },
    Evict {
        context: PageContext,
        kind: StorageKind,
        key: String,
    },
    ReplaceCookies {
        context: PageContext,
        cookies: Vec<Cookie>,
    },
}

/// In-memory aggregate of the three stores for the bound context. Never
/// persisted; rebuilt wholesale on context switch or refresh, mutated
/// incrementally on confirmed single-item edits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorageMirror {
    context: Option<PageContext>,
    local: BTreeMap<String, String>,
    session: BTreeMap<String, String>,
    cookies: Vec<Cookie>,
    failed: Vec<StorageKind>,
}

impl StorageMirror {
    /// Binds the mirror to a new context, discarding everything held for the
    /// previous one.
    pub fn rebind(&mut self, context: PageContext) {
        *self = StorageMirror {
            context: Some(context),
            ..StorageMirror::default()
        };
    }

    pub fn context(&self) -> Option<&PageContext> {
        self.context.as_ref()
    }

    pub fn kv(&self, kind: KvKind) -> &BTreeMap<String, String> {
        match kind {
            KvKind::Local => &self.local,
            KvKind::Session => &self.session,
        }
    }

    fn kv_mut(&mut self, kind: KvKind) -> &mut BTreeMap<String, String> {
        match kind {
            KvKind::Local => &mut self.local,
            KvKind::Session => &mut self.session,
        }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Kinds whose last load degraded to empty.
    pub fn failed(&self) -> &[StorageKind] {
        &self.failed
    }

    pub fn count(&self, kind: StorageKind) -> usize {
        match kind {
            StorageKind::Local => self.local.len(),
            StorageKind::Session => self.session.len(),
            StorageKind::Cookies => self.cookies.len(),
        }
    }

    /// Applies an update unless its originating context no longer matches the
    /// bound one. Returns whether the update was taken.
    pub fn apply(&mut self, update: MirrorUpdate) -> bool {
        match update {
            MirrorUpdate::Adopt(loaded) => {
                if !self.is_current(&loaded.context) {
                    return false;
                }
                self.local = loaded.local;
                self.session = loaded.session;
                self.cookies = loaded.cookies;
                self.failed = loaded.failed;
                true
            }
            MirrorUpdate::Upsert {
                context,
                kind,
                key,
                value,
            } => {
                if !self.is_current(&context) {
                    return false;
                }
                self.kv_mut(kind).insert(key, value);
                true
            }
            MirrorUpdate::Evict { context, kind, key } => {
                if !self.is_current(&context) {
                    return false;
                }
                match kind.kv() {
                    Some(kv) => {
                        self.kv_mut(kv).remove(&key);
                    }
                    None => {
                        if let Some(pos) = self.cookies.iter().position(|c| c.name == key) {
                            self.cookies.remove(pos);
                        }
                    }
                }
                true
            }
            MirrorUpdate::ReplaceCookies { context, cookies } => {
                if !self.is_current(&context) {
                    return false;
                }
                self.cookies = cookies;
                true
            }
        }
    }

    fn is_current(&self, context: &PageContext) -> bool {
        self.context.as_ref() == Some(context)
    }

    /// Case-insensitive substring filter over keys and values of one
    /// key-value kind. An empty query matches everything.
    pub fn search_kv(&self, kind: KvKind, query: &str) -> Vec<(String, ShapedValue)> {
        let needle = query.to_lowercase();
        self.kv(kind)
            .iter()
            .filter(|(key, value)| entry_matches(&needle, key, value))
            .map(|(key, value)| (key.clone(), ShapedValue::classify(value)))
            .collect()
    }

    /// Same filter over cookie names and values, preserving store order.
    pub fn search_cookies(&self, query: &str) -> Vec<Cookie> {
        let needle = query.to_lowercase();
        self.cookies
            .iter()
            .filter(|c| entry_matches(&needle, &c.name, &c.value))
            .cloned()
            .collect()
    }
}

fn entry_matches(needle: &str, key: &str, value: &str) -> bool {
    needle.is_empty()
        || key.to_lowercase().contains(needle)
        || value.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SameSite;

    fn ctx(tab_id: i32, host: &str) -> PageContext {
        PageContext {
            tab_id,
            origin: format!("https://{host}"),
            host: host.to_string(),
        }
    }

    fn loaded(context: &PageContext, pairs: &[(&str, &str)]) -> LoadedStores {
        LoadedStores {
            context: context.clone(),
            local: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            session: BTreeMap::new(),
            cookies: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn cookie(name: &str, value: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: None,
            path: "/".to_string(),
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiration_date: None,
        }
    }

    #[test]
    fn stale_load_cannot_overwrite_rebound_mirror() {
        let first = ctx(1, "a.example");
        let second = ctx(2, "b.example");
        let mut mirror = StorageMirror::default();
        mirror.rebind(first.clone());

        // Context switches while the first load is still in flight.
        mirror.rebind(second.clone());
        assert!(!mirror.apply(MirrorUpdate::Adopt(loaded(&first, &[("stale", "1")]))));
        assert_eq!(mirror.count(StorageKind::Local), 0);

        assert!(mirror.apply(MirrorUpdate::Adopt(loaded(&second, &[("fresh", "1")]))));
        assert_eq!(mirror.count(StorageKind::Local), 1);
    }

    #[test]
    fn upsert_and_evict_respect_context_guard() {
        let bound = ctx(1, "a.example");
        let other = ctx(2, "b.example");
        let mut mirror = StorageMirror::default();
        mirror.rebind(bound.clone());

        assert!(mirror.apply(MirrorUpdate::Upsert {
            context: bound.clone(),
            kind: KvKind::Local,
            key: "k".to_string(),
            value: "v".to_string(),
        }));
        assert!(!mirror.apply(MirrorUpdate::Upsert {
            context: other.clone(),
            kind: KvKind::Local,
            key: "x".to_string(),
            value: "y".to_string(),
        }));
        assert_eq!(mirror.count(StorageKind::Local), 1);

        assert!(!mirror.apply(MirrorUpdate::Evict {
            context: other,
            kind: StorageKind::Local,
            key: "k".to_string(),
        }));
        assert!(mirror.apply(MirrorUpdate::Evict {
            context: bound,
            kind: StorageKind::Local,
            key: "k".to_string(),
        }));
        assert_eq!(mirror.count(StorageKind::Local), 0);
    }

    #[test]
    fn evict_removes_cookie_by_name() {
        let bound = ctx(1, "a.example");
        let mut mirror = StorageMirror::default();
        mirror.rebind(bound.clone());
        mirror.apply(MirrorUpdate::ReplaceCookies {
            context: bound.clone(),
            cookies: vec![cookie("sid", "1"), cookie("theme", "dark")],
        });

        assert!(mirror.apply(MirrorUpdate::Evict {
            context: bound,
            kind: StorageKind::Cookies,
            key: "sid".to_string(),
        }));
        assert_eq!(mirror.cookies().len(), 1);
        assert_eq!(mirror.cookies()[0].name, "theme");
    }

    #[test]
    fn search_matches_keys_and_values_case_insensitively() {
        let bound = ctx(1, "a.example");
        let mut mirror = StorageMirror::default();
        mirror.rebind(bound.clone());
        let mut stores = loaded(&bound, &[("Token", "abc"), ("other", "XYZ"), ("plain", "1")]);
        stores.cookies = vec![cookie("SID", "abcDEF")];
        mirror.apply(MirrorUpdate::Adopt(stores));

        let hits = mirror.search_kv(KvKind::Local, "tok");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "Token");

        let hits = mirror.search_kv(KvKind::Local, "xyz");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "other");

        assert_eq!(mirror.search_kv(KvKind::Local, "").len(), 3);
        assert_eq!(mirror.search_cookies("def").len(), 1);
        assert_eq!(mirror.search_cookies("missing").len(), 0);
    }

    #[test]
    fn search_is_unaffected_by_kind_switching() {
        let bound = ctx(1, "a.example");
        let mut mirror = StorageMirror::default();
        mirror.rebind(bound.clone());
        let mut stores = loaded(&bound, &[("alpha", "1"), ("beta", "2")]);
        stores.session = [("alpha".to_string(), "3".to_string())].into_iter().collect();
        mirror.apply(MirrorUpdate::Adopt(stores));

        let direct = mirror.search_kv(KvKind::Local, "alpha");
        // Simulate the user flipping to the session tab and back.
        let _ = mirror.search_kv(KvKind::Session, "alpha");
        let again = mirror.search_kv(KvKind::Local, "alpha");
        assert_eq!(direct, again);
    }

    #[test]
    fn rebind_discards_previous_contents() {
        let first = ctx(1, "a.example");
        let mut mirror = StorageMirror::default();
        mirror.rebind(first.clone());
        mirror.apply(MirrorUpdate::Adopt(loaded(&first, &[("k", "v")])));

        mirror.rebind(ctx(2, "b.example"));
        assert_eq!(mirror.count(StorageKind::Local), 0);
        assert_eq!(mirror.count(StorageKind::Cookies), 0);
    }
}
