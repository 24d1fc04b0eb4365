//! Defaults for values the config file and command line can override.

/// API level assumed when none is configured.
pub const DEFAULT_API_LEVEL: u32 = 34;

/// How long a single store query may run before the command gives up (seconds).
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "KDECONNECT_SMS_CONFIG";
