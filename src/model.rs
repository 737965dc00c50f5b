use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Session,
    Cookies,
}

impl StorageKind {
    pub const ALL: [StorageKind; 3] = [StorageKind::Local, StorageKind::Session, StorageKind::Cookies];

    pub fn label(self) -> &'static str {
        match self {
            StorageKind::Local => "Local Storage",
            StorageKind::Session => "Session Storage",
            StorageKind::Cookies => "Cookies",
        }
    }

    pub fn kv(self) -> Option<KvKind> {
        match self {
            StorageKind::Local => Some(KvKind::Local),
            StorageKind::Session => Some(KvKind::Session),
            StorageKind::Cookies => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KvKind {
    Local,
    Session,
}

impl KvKind {
    pub fn as_str(self) -> &'static str {
        match self {
            KvKind::Local => "local",
            KvKind::Session => "session",
        }
    }

    pub fn storage_kind(self) -> StorageKind {
        match self {
            KvKind::Local => StorageKind::Local,
            KvKind::Session => StorageKind::Session,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    // chrome.cookies spells this one "no_restriction".
    #[serde(alias = "no_restriction")]
    None,
    #[default]
    Unspecified,
}

impl SameSite {
    pub fn chrome_name(self) -> &'static str {
        match self {
            SameSite::Strict => "strict",
            SameSite::Lax => "lax",
            SameSite::None => "no_restriction",
            SameSite::Unspecified => "unspecified",
        }
    }
}

fn default_cookie_path() -> String {
    "/".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: SameSite,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

impl Cookie {
    /// Copy with the domain attribute normalized for export: a leading "."
    /// carries subdomain-matching semantics in the store but is noise in the
    /// interchange format.
    pub fn normalized_for_export(&self) -> Cookie {
        Cookie {
            domain: self
                .domain
                .as_deref()
                .map(|d| normalize_domain(d).to_string()),
            ..self.clone()
        }
    }

    pub fn is_session(&self) -> bool {
        self.expiration_date.is_none()
    }
}

/// Strips the leading "." a cookie store prepends to subdomain-matching
/// domains. Idempotent.
pub fn normalize_domain(domain: &str) -> &str {
    domain.strip_prefix('.').unwrap_or(domain)
}

/// A fully defaulted cookie write request, in the shape chrome.cookies.set
/// expects. Built by `shape_cookie_write`, never by hand.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieWrite {
    pub url: String,
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

/// Applies the write-side defaulting rules: empty path becomes "/", an unset
/// sameSite becomes lax, and the domain attribute is dropped entirely when it
/// matches the context host so the store binds the cookie to the request
/// origin instead of creating a duplicate domain-scoped one. A missing
/// expirationDate stays missing (session-lifetime cookie).
pub fn shape_cookie_write(origin: &str, host: &str, cookie: &Cookie) -> CookieWrite {
    let path = if cookie.path.is_empty() {
        default_cookie_path()
    } else {
        cookie.path.clone()
    };
    let domain = cookie
        .domain
        .as_deref()
        .map(normalize_domain)
        .filter(|d| !d.is_empty() && *d != host)
        .map(str::to_string);
    let same_site = match cookie.same_site {
        SameSite::Unspecified => SameSite::Lax,
        other => other,
    };
    CookieWrite {
        url: format!("{origin}{path}"),
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain,
        path,
        secure: cookie.secure,
        http_only: cookie.http_only,
        same_site: same_site.chrome_name(),
        expiration_date: cookie.expiration_date,
    }
}

/// Display classification of a stored string. Structured values pretty-print
/// on expand; the stored string itself is never rewritten for display.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapedValue {
    Plain(String),
    Structured(String, Value),
}

impl ShapedValue {
    pub fn classify(raw: &str) -> ShapedValue {
        match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => {
                ShapedValue::Structured(raw.to_string(), parsed)
            }
            _ => ShapedValue::Plain(raw.to_string()),
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            ShapedValue::Plain(raw) => raw,
            ShapedValue::Structured(raw, _) => raw,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ShapedValue::Structured(..))
    }

    pub fn pretty(&self) -> Option<String> {
        match self {
            ShapedValue::Plain(_) => None,
            ShapedValue::Structured(_, parsed) => serde_json::to_string_pretty(parsed).ok(),
        }
    }
}

/// Minifies a value that parses as a JSON object or array; everything else
/// passes through byte-identical. Bare scalars ("42", "true") count as plain
/// so user text is never rewritten by accident.
pub fn canonicalize_value(raw: &str) -> String {
    match ShapedValue::classify(raw) {
        ShapedValue::Structured(original, parsed) => {
            serde_json::to_string(&parsed).unwrap_or(original)
        }
        ShapedValue::Plain(original) => original,
    }
}
