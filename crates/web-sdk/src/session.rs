//! Anonymous session identity persisted through a cookie-like store.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

/// Cookie storage scoped to the document's origin.
pub trait CookieStore: Send + Sync {
    /// All cookies as one `name=value; name=value` string.
    fn cookie_string(&self) -> String;

    fn set_cookie(&self, name: &str, value: &str, path: &str);

    /// First cookie named `name`.
    fn get(&self, name: &str) -> Option<String> {
        self.cookie_string().split("; ").find_map(|cookie| {
            let mut parts = cookie.split('=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if key == name => Some(value.to_string()),
                _ => None,
            }
        })
    }
}

/// In-memory cookie jar.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<(String, String, String)>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the jar from a `name=value; name=value` string.
    pub fn from_cookie_string(raw: &str) -> Self {
        let jar = Self::new();
        for cookie in raw.split("; ").filter(|c| !c.is_empty()) {
            let (name, value) = cookie.split_once('=').unwrap_or((cookie, ""));
            jar.set_cookie(name, value, "/");
        }
        jar
    }

    /// Path the cookie was last written with.
    pub fn path_of(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, _, path)| path.clone())
    }
}

impl CookieStore for MemoryCookieJar {
    fn cookie_string(&self) -> String {
        self.cookies
            .lock()
            .iter()
            .map(|(name, value, _)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, name: &str, value: &str, path: &str) {
        let mut cookies = self.cookies.lock();
        match cookies.iter_mut().find(|(n, _, _)| n == name) {
            Some(entry) => {
                entry.1 = value.to_string();
                entry.2 = path.to_string();
            }
            None => cookies.push((name.to_string(), value.to_string(), path.to_string())),
        }
    }
}

/// Random identifier shaped like a UUID (`8-4-4-4-12` lower hex). The bits
/// come from a non-cryptographic source and carry no version or variant, so
/// it must not be used where unguessability matters.
pub fn generate_identifier() -> String {
    let bits: u128 = rand::thread_rng().gen();
    Uuid::from_u128(bits).hyphenated().to_string()
}

/// Reads or creates the session identifier.
pub struct SessionIdentity {
    store: Arc<dyn CookieStore>,
    default_cookie_name: String,
    cookie_path: String,
    current: Mutex<Option<String>>,
}

impl SessionIdentity {
    pub fn new(
        store: Arc<dyn CookieStore>,
        default_cookie_name: impl Into<String>,
        cookie_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            default_cookie_name: default_cookie_name.into(),
            cookie_path: cookie_path.into(),
            current: Mutex::new(None),
        }
    }

    /// Identifier stored under `cookie_name` (or the default name), returned
    /// as stored even when empty. When the cookie is missing,
    /// `default_identifier` or a generated one is written.
    pub fn ensure(&self, cookie_name: Option<&str>, default_identifier: Option<&str>) -> String {
        let name = cookie_name.unwrap_or(&self.default_cookie_name);
        let identifier = match self.store.get(name) {
            Some(existing) => existing,
            None => {
                let fresh = default_identifier
                    .map(str::to_string)
                    .unwrap_or_else(generate_identifier);
                self.store.set_cookie(name, &fresh, &self.cookie_path);
                info!(cookie = %name, "session identifier created");
                fresh
            }
        };
        *self.current.lock() = Some(identifier.clone());
        identifier
    }

    /// Identifier from the last `ensure` call.
    pub fn current(&self) -> Option<String> {
        self.current.lock().clone()
    }
}
