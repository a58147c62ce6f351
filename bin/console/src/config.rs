//! Console host configuration.
//!
//! Loaded from `FRONTDESK_`-prefixed environment variables, with `__`
//! separating nested keys:
//!
//! ```text
//! FRONTDESK_API_BASE_URL=https://hotel.example.com/api
//! FRONTDESK_STATE_PATH=/var/lib/frontdesk/session.json
//! FRONTDESK_ACCESS__SUPERUSER_ROLE=1
//! FRONTDESK_ACCESS__ROUTES__LANDING=/bookings
//! ```

use frontdesk_platform_access::AccessConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Console configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the back-office API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// File holding the persisted session.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Access layer configuration.
    #[serde(default)]
    pub access: AccessConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".frontdesk/session.json")
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            state_path: default_state_path(),
            access: AccessConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix("FRONTDESK"))
    }

    fn from_environment(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
