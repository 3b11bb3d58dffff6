//! Server configuration from environment variables.

use actix_web::cookie::Key;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings. Every field has a default; bad values fall back to it with a warning.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// HOST, e.g. 0.0.0.0
    pub host: String,
    /// PORT, e.g. 8080
    pub port: u16,
    /// ROOM_IDLE_MINUTES: rooms without activity for this long are removed.
    pub room_idle: chrono::Duration,
    /// CLEANUP_INTERVAL_MINUTES: how often idle rooms are swept.
    pub cleanup_interval: Duration,
    /// DATA_DIR: persist snapshots as JSON here; in memory when unset.
    pub data_dir: Option<PathBuf>,
    /// BROADCAST_CAPACITY: buffered snapshots per room before slow streams skip ahead.
    pub broadcast_capacity: usize,
    /// SECURE_COOKIES: only send the session cookie over HTTPS.
    pub secure_cookies: bool,
    /// SESSION_KEY: at least 64 bytes. Without it sessions don't survive a restart.
    pub session_key: Option<Secret>,
}

/// A configured secret; never printed.
#[derive(Clone, PartialEq)]
pub struct Secret(String);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

const DEFAULT_IDLE_MINUTES: i64 = 10;
const DEFAULT_CLEANUP_MINUTES: u64 = 5;
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            room_idle: chrono::Duration::minutes(DEFAULT_IDLE_MINUTES),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_MINUTES * 60),
            data_dir: None,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            secure_cookies: false,
            session_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let idle_minutes = positive(&lookup, "ROOM_IDLE_MINUTES", DEFAULT_IDLE_MINUTES);
        let cleanup_minutes = positive(&lookup, "CLEANUP_INTERVAL_MINUTES", DEFAULT_CLEANUP_MINUTES);
        Self {
            host: lookup("HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| Self::default().host),
            port: parsed(&lookup, "PORT", 8080),
            room_idle: chrono::Duration::try_minutes(idle_minutes)
                .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_IDLE_MINUTES)),
            cleanup_interval: Duration::from_secs(cleanup_minutes.saturating_mul(60)),
            data_dir: lookup("DATA_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            broadcast_capacity: positive(&lookup, "BROADCAST_CAPACITY", DEFAULT_BROADCAST_CAPACITY),
            secure_cookies: parsed(&lookup, "SECURE_COOKIES", false),
            session_key: lookup("SESSION_KEY").filter(|k| !k.is_empty()).map(Secret),
        }
    }

    /// Cookie signing key from SESSION_KEY, or a random one for this process only.
    pub fn session_key(&self) -> Key {
        let Some(Secret(raw)) = &self.session_key else {
            log::warn!("SESSION_KEY not set; participant sessions will not survive a restart");
            return Key::generate();
        };
        Key::try_from(raw.as_bytes()).unwrap_or_else(|e| {
            log::warn!("Ignoring SESSION_KEY ({e}); using a random key");
            Key::generate()
        })
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {key}={raw:?}");
            default
        }),
    }
}

fn positive<T: FromStr + PartialOrd + Default + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    let value = parsed(lookup, key, default);
    if value > T::default() {
        value
    } else {
        log::warn!("{key} must be positive; using the default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn reads_values() {
        let c = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("ROOM_IDLE_MINUTES", "30"),
            ("DATA_DIR", "/var/lib/rooms"),
            ("SECURE_COOKIES", "true"),
        ]);
        assert_eq!(c.host, "127.0.0.1");
        assert_eq!(c.port, 9000);
        assert_eq!(c.room_idle, chrono::Duration::minutes(30));
        assert_eq!(c.data_dir, Some(PathBuf::from("/var/lib/rooms")));
        assert!(c.secure_cookies);
    }

    #[test]
    fn session_key_is_stable_across_restarts() {
        let secret = "k".repeat(64);
        let first = config(&[("SESSION_KEY", secret.as_str())]).session_key();
        let second = config(&[("SESSION_KEY", secret.as_str())]).session_key();
        assert_eq!(first.master(), second.master());
        assert_eq!(first.master(), secret.as_bytes());
        assert!(!format!("{:?}", config(&[("SESSION_KEY", secret.as_str())])).contains(&secret));
    }

    #[test]
    fn short_or_missing_session_key_falls_back_to_a_random_one() {
        let short = config(&[("SESSION_KEY", "too-short")]);
        assert_ne!(short.session_key().master(), short.session_key().master());
        let unset = config(&[]);
        assert!(unset.session_key.is_none());
        assert_eq!(unset.session_key().master().len(), 64);
    }

    #[test]
    fn invalid_values_fall_back() {
        let c = config(&[("PORT", "eighty"), ("BROADCAST_CAPACITY", "0"), ("ROOM_IDLE_MINUTES", "-3")]);
        assert_eq!(c.port, 8080);
        assert_eq!(c.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
        assert_eq!(c.room_idle, chrono::Duration::minutes(DEFAULT_IDLE_MINUTES));
    }
}
