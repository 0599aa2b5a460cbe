//! # API Configuration
//!
//! Server, database, establishment and provider settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ENTREGA_PORT=9090                                                  │
//! │     ENTREGA_ORIGIN_LAT=-23.5660                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $ENTREGA_CONFIG, or                                                │
//! │     ~/.config/entrega/logistics.toml (Linux)                           │
//! │     ~/Library/Application Support/com.entrega.entrega/logistics.toml   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "./entrega.db"
//!
//! [establishment]
//! name = "Pizzaria Bella"
//! origin = { lat = -23.5660, lng = -46.6850 }
//! utc_offset_minutes = -180  # America/Sao_Paulo, used for peak hours
//!
//! [eta]
//! base_prep_minutes = 20
//! average_speed_kmh = 25.0
//! road_factor = 1.3
//! window_spread_minutes = 10
//! peak_windows = [
//!   { start_minute = 690, end_minute = 840, extra_prep_minutes = 15 },
//! ]
//!
//! [routing]
//! enabled = true
//! base_url = "https://router.project-osrm.org"
//! timeout_ms = 2500
//!
//! [geocoding]
//! base_url = "https://nominatim.openstreetmap.org"
//! country_codes = "br"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use entrega_core::{Coordinates, EtaConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "ENTREGA_CONFIG";

// =============================================================================
// Sections
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Requests running longer than this are answered with 408.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./entrega.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Where orders leave from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstablishmentSettings {
    #[serde(default = "default_establishment_name")]
    pub name: String,

    /// Kitchen location; every distance is measured from here.
    #[serde(default = "default_origin")]
    pub origin: Coordinates,

    /// Local time offset, so peak windows match the kitchen's clock.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_establishment_name() -> String {
    "Entrega".to_string()
}

fn default_origin() -> Coordinates {
    // Praça da Sé, São Paulo
    Coordinates {
        lat: -23.5505,
        lng: -46.6333,
    }
}

fn default_utc_offset_minutes() -> i32 {
    -180
}

impl Default for EstablishmentSettings {
    fn default() -> Self {
        EstablishmentSettings {
            name: default_establishment_name(),
            origin: default_origin(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl EstablishmentSettings {
    /// The establishment's local offset.
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
    }
}

/// OSRM-compatible routing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// When off, every ETA uses the distance heuristic.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_routing_url")]
    pub base_url: String,

    /// Kept short: a slow router falls back to the heuristic.
    #[serde(default = "default_routing_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_routing_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_routing_timeout_ms() -> u64 {
    2500
}

impl Default for RoutingSettings {
    fn default() -> Self {
        RoutingSettings {
            enabled: true,
            base_url: default_routing_url(),
            timeout_ms: default_routing_timeout_ms(),
        }
    }
}

impl RoutingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Nominatim-compatible geocoding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_geocoding_url")]
    pub base_url: String,

    #[serde(default = "default_geocoding_timeout_ms")]
    pub timeout_ms: u64,

    /// Nominatim's usage policy requires an identifying agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Comma-separated ISO 3166-1 codes limiting the search.
    #[serde(default = "default_country_codes")]
    pub country_codes: Option<String>,
}

fn default_geocoding_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoding_timeout_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    format!("entrega-logistics/{}", env!("CARGO_PKG_VERSION"))
}

fn default_country_codes() -> Option<String> {
    Some("br".to_string())
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        GeocodingSettings {
            enabled: true,
            base_url: default_geocoding_url(),
            timeout_ms: default_geocoding_timeout_ms(),
            user_agent: default_user_agent(),
            country_codes: default_country_codes(),
        }
    }
}

impl GeocodingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// ApiConfig
// =============================================================================

/// Complete logistics API configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub establishment: EstablishmentSettings,

    #[serde(default)]
    pub eta: EtaConfig,

    #[serde(default)]
    pub routing: RoutingSettings,

    #[serde(default)]
    pub geocoding: GeocodingSettings,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`path`, then `$ENTREGA_CONFIG`, then the platform
    ///    config dir). A missing file is fine; an unreadable one is not.
    /// 3. `ENTREGA_*` environment variables
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = ApiConfig::default();

        let path = path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; absent sections keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies `ENTREGA_*` overrides read through `lookup`.
    ///
    /// ## Variables
    /// | Variable | Field |
    /// |---|---|
    /// | `ENTREGA_HOST` / `ENTREGA_PORT` | server |
    /// | `ENTREGA_DATABASE_PATH` | database.path |
    /// | `ENTREGA_ORIGIN_LAT` / `ENTREGA_ORIGIN_LNG` | establishment.origin |
    /// | `ENTREGA_UTC_OFFSET_MINUTES` | establishment.utc_offset_minutes |
    /// | `ENTREGA_BASE_PREP_MINUTES` | eta.base_prep_minutes |
    /// | `ENTREGA_ROUTING_ENABLED` / `ENTREGA_ROUTING_URL` | routing |
    /// | `ENTREGA_GEOCODING_ENABLED` / `ENTREGA_GEOCODING_URL` | geocoding |
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ENTREGA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "ENTREGA_PORT")? {
            debug!(port, "Overriding port from environment");
            self.server.port = port;
        }
        if let Some(path) = lookup("ENTREGA_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(lat) = parse_var(&lookup, "ENTREGA_ORIGIN_LAT")? {
            self.establishment.origin.lat = lat;
        }
        if let Some(lng) = parse_var(&lookup, "ENTREGA_ORIGIN_LNG")? {
            self.establishment.origin.lng = lng;
        }
        if let Some(offset) = parse_var(&lookup, "ENTREGA_UTC_OFFSET_MINUTES")? {
            self.establishment.utc_offset_minutes = offset;
        }
        if let Some(prep) = parse_var(&lookup, "ENTREGA_BASE_PREP_MINUTES")? {
            self.eta.base_prep_minutes = prep;
        }
        if let Some(enabled) = parse_var(&lookup, "ENTREGA_ROUTING_ENABLED")? {
            self.routing.enabled = enabled;
        }
        if let Some(url) = lookup("ENTREGA_ROUTING_URL") {
            debug!(url = %url, "Overriding routing URL from environment");
            self.routing.base_url = url;
        }
        if let Some(enabled) = parse_var(&lookup, "ENTREGA_GEOCODING_ENABLED")? {
            self.geocoding.enabled = enabled;
        }
        if let Some(url) = lookup("ENTREGA_GEOCODING_URL") {
            self.geocoding.base_url = url;
        }
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.establishment
            .origin
            .validate()
            .map_err(|e| ConfigError::invalid("establishment.origin", e.to_string()))?;

        if self.establishment.offset().is_none() {
            return Err(ConfigError::invalid(
                "establishment.utc_offset_minutes",
                "must be within ±24h",
            ));
        }

        self.eta
            .validate()
            .map_err(|e| ConfigError::invalid("eta", e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be greater than 0",
            ));
        }

        for (field, url) in [
            ("routing.base_url", &self.routing.base_url),
            ("geocoding.base_url", &self.geocoding.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid(
                    field,
                    format!("must start with http:// or https://, got: {}", url),
                ));
            }
        }

        Ok(())
    }

    /// Address the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "entrega", "entrega")
            .map(|dirs| dirs.config_dir().join("logistics.toml"))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(None),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}")]
    Read(String),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.eta, EtaConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApiConfig::from_toml(
            r#"
            [server]
            port = 9000

            [establishment]
            name = "Pizzaria Bella"
            origin = { lat = -23.5660, lng = -46.6850 }
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.establishment.name, "Pizzaria Bella");
        assert_eq!(config.establishment.utc_offset_minutes, -180);
        assert!(config.routing.enabled);
    }

    #[test]
    fn test_eta_section() {
        let config = ApiConfig::from_toml(
            r#"
            [eta]
            base_prep_minutes = 25
            average_speed_kmh = 30.0
            road_factor = 1.2
            window_spread_minutes = 15
            peak_windows = [{ start_minute = 1140, end_minute = 1320, extra_prep_minutes = 20 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.eta.base_prep_minutes, 25);
        assert_eq!(config.eta.peak_windows.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            ApiConfig::from_toml("[server]\nport = \"abc\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ApiConfig::default();
        config
            .apply_overrides(env(&[
                ("ENTREGA_PORT", "9090"),
                ("ENTREGA_ORIGIN_LAT", "-22.9068"),
                ("ENTREGA_ORIGIN_LNG", "-43.1729"),
                ("ENTREGA_ROUTING_ENABLED", "false"),
                ("ENTREGA_DATABASE_PATH", "/tmp/entrega.db"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.establishment.origin.lat, -22.9068);
        assert!(!config.routing.enabled);
        assert_eq!(config.database.path, PathBuf::from("/tmp/entrega.db"));
    }

    #[test]
    fn test_unparseable_env_is_an_error() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_overrides(env(&[("ENTREGA_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "ENTREGA_PORT"));
    }

    #[test]
    fn test_validation() {
        let mut config = ApiConfig::default();
        config.establishment.origin.lat = 95.0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.routing.base_url = "router.local".to_string();
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.eta.average_speed_kmh = 0.0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.establishment.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("entrega-missing-{}.toml", uuid::Uuid::new_v4()));
        assert!(ApiConfig::load(Some(path)).is_ok());
    }
}
