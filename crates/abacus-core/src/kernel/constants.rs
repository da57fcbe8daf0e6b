/// Application name
pub const APP_NAME: &str = "Abacus";

/// Application version
pub const APP_VERSION: &str = "0.1.0";

/// Current plugin API version
pub const API_VERSION: &str = "1.0.0";

/// Default timeout for a plugin's `validate` step, in milliseconds
pub const DEFAULT_VALIDATE_TIMEOUT_MS: u64 = 5_000;

/// Default timeout for a plugin's `compute` step, in milliseconds
pub const DEFAULT_COMPUTE_TIMEOUT_MS: u64 = 10_000;

/// Maximum number of config change events kept in history
pub const DEFAULT_HISTORY_CAP: usize = 1_000;

/// Capacity of the bounded config change broadcast channel
pub const DEFAULT_CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the runtime event hub
pub const DEFAULT_EVENT_HUB_CAPACITY: usize = 256;

/// Storage key prefix for persisted plugin configs
pub const CONFIG_KEY_PREFIX: &str = "plugin-config:";

/// Id of the built-in template every plugin can fall back to
pub const GENERIC_TEMPLATE_ID: &str = "generic";

/// Locale used when a translation is missing
pub const DEFAULT_LOCALE: &str = "en";

/// Actor recorded for changes made by the runtime itself
pub const SYSTEM_ACTOR: &str = "system";

/// Build the storage key for a plugin's persisted config
pub fn config_key(plugin_id: &str) -> String {
    format!("{}{}", CONFIG_KEY_PREFIX, plugin_id)
}

/// Storage key for the persisted config change history
pub const HISTORY_KEY: &str = "config-history";
