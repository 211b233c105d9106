use std::str::FromStr;
use std::time::Duration;

use onair_core::ids::ShowStyleVariantId;

/// Engine policy loaded from environment variables.
///
/// Tests construct it directly or start from [`Default`].
#[derive(Debug, Clone)]
pub struct PlayoutSettings {
    /// Permit more than one active playlist per studio (default: `false`).
    pub allow_multiple_active_playlists: bool,
    /// Guard window around autonext and between takes (default: 1000ms).
    pub minimum_take_span: chrono::Duration,
    /// Permit resetting a playlist that is live on air (default: `false`).
    pub allow_reset_on_air: bool,
    /// Per-attempt lock wait (default: 5000ms).
    pub lock_timeout: Duration,
    /// How many times a `LockTimeout` is retried before surfacing (default: 3).
    pub lock_retry_attempts: u32,
    /// Variants offered to the blueprint when a rundown is ingested.
    pub show_style_variants: Vec<ShowStyleVariantId>,
}

impl Default for PlayoutSettings {
    fn default() -> Self {
        Self {
            allow_multiple_active_playlists: false,
            minimum_take_span: chrono::Duration::milliseconds(1000),
            allow_reset_on_air: false,
            lock_timeout: Duration::from_millis(5000),
            lock_retry_attempts: 3,
            show_style_variants: vec![ShowStyleVariantId::new("default")],
        }
    }
}

impl PlayoutSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                           | Default   |
    /// |-----------------------------------|-----------|
    /// | `MINIMUM_TAKE_SPAN_MS`            | `1000`    |
    /// | `ALLOW_MULTIPLE_ACTIVE_PLAYLISTS` | `false`   |
    /// | `ALLOW_RESET_ON_AIR`              | `false`   |
    /// | `LOCK_TIMEOUT_MS`                 | `5000`    |
    /// | `LOCK_RETRY_ATTEMPTS`             | `3`       |
    /// | `SHOW_STYLE_VARIANTS`             | `default` |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let show_style_variants: Vec<ShowStyleVariantId> = std::env::var("SHOW_STYLE_VARIANTS")
            .unwrap_or_else(|_| "default".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ShowStyleVariantId::new)
            .collect();

        Self {
            allow_multiple_active_playlists: env_or(
                "ALLOW_MULTIPLE_ACTIVE_PLAYLISTS",
                defaults.allow_multiple_active_playlists,
            ),
            minimum_take_span: chrono::Duration::milliseconds(env_or("MINIMUM_TAKE_SPAN_MS", 1000)),
            allow_reset_on_air: env_or("ALLOW_RESET_ON_AIR", defaults.allow_reset_on_air),
            lock_timeout: Duration::from_millis(env_or("LOCK_TIMEOUT_MS", 5000)),
            lock_retry_attempts: env_or("LOCK_RETRY_ATTEMPTS", defaults.lock_retry_attempts),
            show_style_variants,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid setting, using default");
            default
        }),
        Err(_) => default,
    }
}
