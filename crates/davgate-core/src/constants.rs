/// Prefix for environment variables that override configuration keys.
pub const ENV_PREFIX: &str = "DAVGATE";
/// Names an extra configuration file to load on top of the defaults.
pub const CONFIG_PATH_ENV: &str = "DAVGATE_CONFIG";

pub const SYSTEM_CONFIG_PATH: &str = "/etc/davgate/config";
pub const LOCAL_CONFIG_NAME: &str = "config";

/// Values starting with this marker are read from the named environment variable.
pub const ENV_REFERENCE_MARKER: &str = "{env}";

/// Host list entry that matches every Origin.
pub const WILDCARD: &str = "*";

pub const DEFAULT_REALM: &str = "Restricted";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_BYTES: i64 = 1 << 30;
