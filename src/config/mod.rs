//! Runtime configuration resolved from the environment.
//!
//! `board` reads a small set of environment variables at startup and falls
//! back to documented defaults for everything else. There is no dynamic
//! reconfiguration: a [`BoardConfig`] is built once and handed to every
//! service constructor, replacing the module-level global state of earlier
//! prototype implementations.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Overrides `pool_size` (connections).
const ENV_POOL_SIZE: &str = "MESSAGE_BOARD_POOL_SIZE";
/// Overrides `pool_timeout` (seconds).
const ENV_POOL_TIMEOUT_SECS: &str = "MESSAGE_BOARD_POOL_TIMEOUT_SECS";
/// Overrides `retention_min_length` (characters).
const ENV_RETENTION_MIN_LENGTH: &str = "MESSAGE_BOARD_RETENTION_MIN_LENGTH";
/// Overrides `retention_max_age` (seconds).
const ENV_RETENTION_MAX_AGE_SECS: &str = "MESSAGE_BOARD_RETENTION_MAX_AGE_SECS";
/// Overrides `retention_grace` (seconds).
const ENV_RETENTION_GRACE_SECS: &str = "MESSAGE_BOARD_RETENTION_GRACE_SECS";
/// Overrides `legacy_lossy_retention` (`true`/`false`).
const ENV_LEGACY_LOSSY_RETENTION: &str = "MESSAGE_BOARD_LEGACY_LOSSY_RETENTION";
/// Overrides `wait_timeout` (seconds).
const ENV_WAIT_TIMEOUT_SECS: &str = "MESSAGE_BOARD_WAIT_TIMEOUT_SECS";
/// Overrides `sweeper_timeout` (seconds).
const ENV_SWEEPER_TIMEOUT_SECS: &str = "MESSAGE_BOARD_SWEEPER_TIMEOUT_SECS";

/// Default number of pooled store connections.
pub const DEFAULT_POOL_SIZE: u32 = 5;

/// Default timeout for acquiring a pooled connection.
pub const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum content length retained by cleanup (§ retention floor).
pub const DEFAULT_RETENTION_MIN_LENGTH: usize = 20;

/// Default maximum age of a message before it is eligible for cleanup.
pub const DEFAULT_RETENTION_MAX_AGE: Duration = Duration::from_secs(3_600);

/// Grace window during which a short message is exempt from the length
/// floor, so a reply sent moments ago is never destroyed by retention.
pub const DEFAULT_RETENTION_GRACE: Duration = Duration::from_secs(30);

/// Heartbeat age past which a waiting-agent record is reported as timed out
/// by `get_waiting_agents`.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default heartbeat age past which the liveness sweeper marks an agent
/// offline and fails its running task.
pub const DEFAULT_SWEEPER_TIMEOUT: Duration = Duration::from_secs(120);

/// Polling interval used during the first [`WAIT_FAST_PHASE`] of a
/// `wait_for_message` call.
pub const WAIT_FAST_POLL: Duration = Duration::from_millis(500);

/// Duration of the fast-polling phase at the start of a wait.
pub const WAIT_FAST_PHASE: Duration = Duration::from_secs(30);

/// Polling interval used after [`WAIT_FAST_PHASE`] has elapsed.
pub const WAIT_SLOW_POLL: Duration = Duration::from_secs(5);

/// Resolved runtime configuration for a broker process.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Directory holding the store file and its write-ahead log sidecars.
    pub state_dir: PathBuf,
    /// Default agent identity used by thin CLI wrappers when none is given.
    pub default_client_id: Option<String>,
    /// Maximum number of pooled store connections.
    pub pool_size: u32,
    /// Timeout for acquiring a pooled connection.
    pub pool_timeout: Duration,
    /// Minimum retained message content length.
    pub retention_min_length: usize,
    /// Maximum retained message age.
    pub retention_max_age: Duration,
    /// Grace window exempting recent short messages from the length floor.
    pub retention_grace: Duration,
    /// When set, retention reproduces the original unconditional
    /// short-message and duplicate pruning with no grace window. Off by
    /// default; kept only for bug-compatibility with the original tool.
    pub legacy_lossy_retention: bool,
    /// Heartbeat age beyond which `get_waiting_agents` reports `is_timeout`.
    pub wait_timeout: Duration,
    /// Default heartbeat age used by the liveness sweeper.
    pub sweeper_timeout: Duration,
}

impl BoardConfig {
    /// Builds configuration from environment variables, falling back to
    /// documented defaults for anything unset or unparsable.
    ///
    /// Reads `MESSAGE_BOARD_DIR` (state directory, defaults to
    /// `~/.message_board`) and `MESSAGE_CLIENT_ID` (default agent identity),
    /// plus one override per remaining field: `MESSAGE_BOARD_POOL_SIZE`,
    /// `MESSAGE_BOARD_POOL_TIMEOUT_SECS`, `MESSAGE_BOARD_RETENTION_MIN_LENGTH`,
    /// `MESSAGE_BOARD_RETENTION_MAX_AGE_SECS`,
    /// `MESSAGE_BOARD_RETENTION_GRACE_SECS`,
    /// `MESSAGE_BOARD_LEGACY_LOSSY_RETENTION` (`true`/`false`),
    /// `MESSAGE_BOARD_WAIT_TIMEOUT_SECS`, and
    /// `MESSAGE_BOARD_SWEEPER_TIMEOUT_SECS`. A set-but-unparsable value is
    /// logged and the default is kept, rather than failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        let state_dir = std::env::var_os("MESSAGE_BOARD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);
        let default_client_id = std::env::var("MESSAGE_CLIENT_ID").ok();

        Self {
            state_dir,
            default_client_id,
            pool_size: env_override(ENV_POOL_SIZE, DEFAULT_POOL_SIZE),
            pool_timeout: env_override_secs(ENV_POOL_TIMEOUT_SECS, DEFAULT_POOL_TIMEOUT),
            retention_min_length: env_override(ENV_RETENTION_MIN_LENGTH, DEFAULT_RETENTION_MIN_LENGTH),
            retention_max_age: env_override_secs(ENV_RETENTION_MAX_AGE_SECS, DEFAULT_RETENTION_MAX_AGE),
            retention_grace: env_override_secs(ENV_RETENTION_GRACE_SECS, DEFAULT_RETENTION_GRACE),
            legacy_lossy_retention: env_override(ENV_LEGACY_LOSSY_RETENTION, false),
            wait_timeout: env_override_secs(ENV_WAIT_TIMEOUT_SECS, DEFAULT_WAIT_TIMEOUT),
            sweeper_timeout: env_override_secs(ENV_SWEEPER_TIMEOUT_SECS, DEFAULT_SWEEPER_TIMEOUT),
        }
    }

    /// Path to the embedded store file within [`Self::state_dir`].
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("board.db")
    }
}

fn default_state_dir() -> PathBuf {
    dirs_home().join(".message_board")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Reads `key` and parses it as `T`, falling back to `default` when the
/// variable is unset or fails to parse. A set-but-unparsable value is
/// logged so a typo in an override doesn't silently fall through.
fn env_override<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, raw, "ignoring unparsable override, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Like [`env_override`], but for a seconds count that must be turned into a
/// [`Duration`].
fn env_override_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_override(key, default.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    #[test]
    fn database_path_joins_state_dir() {
        let config = BoardConfig {
            state_dir: PathBuf::from("/tmp/board-test"),
            default_client_id: None,
            pool_size: DEFAULT_POOL_SIZE,
            pool_timeout: DEFAULT_POOL_TIMEOUT,
            retention_min_length: DEFAULT_RETENTION_MIN_LENGTH,
            retention_max_age: DEFAULT_RETENTION_MAX_AGE,
            retention_grace: DEFAULT_RETENTION_GRACE,
            legacy_lossy_retention: false,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            sweeper_timeout: DEFAULT_SWEEPER_TIMEOUT,
        };
        assert_eq!(config.database_path(), PathBuf::from("/tmp/board-test/board.db"));
    }

    static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

    /// Scoped environment variable override, restored on drop. Guards every
    /// mutation behind a process-wide mutex so these tests may run
    /// concurrently with the rest of the suite without racing each other.
    struct EnvVarGuard {
        previous: Vec<(OsString, Option<OsString>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvVarGuard {
        fn set_many(changes: &[(&str, Option<&str>)]) -> Self {
            let lock = ENV_MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut previous = Vec::with_capacity(changes.len());
            for (key, value) in changes {
                previous.push((OsString::from(key), std::env::var_os(key)));
                // SAFETY: `_lock` serializes every environment mutation made by this guard type.
                unsafe {
                    match value {
                        Some(v) => std::env::set_var(key, v),
                        None => std::env::remove_var(key),
                    }
                }
            }
            Self { previous, _lock: lock }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            for (key, value) in self.previous.drain(..) {
                // SAFETY: `_lock` serializes every environment mutation made by this guard type.
                unsafe {
                    match value {
                        Some(previous) => std::env::set_var(&key, previous),
                        None => std::env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn from_env_applies_numeric_and_duration_overrides() {
        let _guard = EnvVarGuard::set_many(&[
            (ENV_POOL_SIZE, Some("9")),
            (ENV_POOL_TIMEOUT_SECS, Some("12")),
            (ENV_RETENTION_MIN_LENGTH, Some("4")),
            (ENV_RETENTION_MAX_AGE_SECS, Some("100")),
            (ENV_RETENTION_GRACE_SECS, Some("7")),
            (ENV_LEGACY_LOSSY_RETENTION, Some("true")),
            (ENV_WAIT_TIMEOUT_SECS, Some("15")),
            (ENV_SWEEPER_TIMEOUT_SECS, Some("200")),
            ("MESSAGE_BOARD_DIR", None),
            ("MESSAGE_CLIENT_ID", None),
        ]);

        let config = BoardConfig::from_env();
        assert_eq!(config.pool_size, 9);
        assert_eq!(config.pool_timeout, Duration::from_secs(12));
        assert_eq!(config.retention_min_length, 4);
        assert_eq!(config.retention_max_age, Duration::from_secs(100));
        assert_eq!(config.retention_grace, Duration::from_secs(7));
        assert!(config.legacy_lossy_retention);
        assert_eq!(config.wait_timeout, Duration::from_secs(15));
        assert_eq!(config.sweeper_timeout, Duration::from_secs(200));
    }

    #[test]
    fn from_env_falls_back_to_defaults_on_unparsable_override() {
        let _guard = EnvVarGuard::set_many(&[(ENV_POOL_SIZE, Some("not-a-number"))]);
        let config = BoardConfig::from_env();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    }
}
