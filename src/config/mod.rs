use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Hard ceiling for any list page, regardless of environment overrides.
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub list: ListConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret Supabase signs access tokens with (HS256).
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Restrict list rows by warehouse / ownership of the calling user.
    pub scoping_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub enable_loki: bool,
    pub enable_logtail: bool,
    pub default_filter: String,
}

impl LoggingConfig {
    /// A log shipper is attached to stdout, so emit one JSON object per line.
    pub fn json_output(&self) -> bool {
        self.enable_loki || self.enable_logtail
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub scd2_use_v3: bool,
}

impl FeatureConfig {
    pub fn scd2_patch_function(&self) -> &'static str {
        if self.scd2_use_v3 {
            "fn_tcm_tally_cards_patch_scd2_v3"
        } else {
            "fn_tcm_tally_cards_patch_scd2_v2"
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("STOCKROOM_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // List overrides
        if let Ok(v) = env::var("LIST_DEFAULT_PAGE_SIZE") {
            self.list.default_page_size = v.parse().unwrap_or(self.list.default_page_size);
        }
        if let Ok(v) = env::var("LIST_MAX_PAGE_SIZE") {
            self.list.max_page_size = v.parse().unwrap_or(self.list.max_page_size);
        }
        self.list.max_page_size = self.list.max_page_size.clamp(1, MAX_PAGE_SIZE);
        self.list.default_page_size = self.list.default_page_size.clamp(1, self.list.max_page_size);

        // Auth overrides
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_SCOPING_ENABLED") {
            self.auth.scoping_enabled = parse_flag(&v).unwrap_or(self.auth.scoping_enabled);
        }

        // Logging overrides
        if let Ok(v) = env::var("LOG_ENABLE_LOKI") {
            self.logging.enable_loki = parse_flag(&v).unwrap_or(self.logging.enable_loki);
        }
        if let Ok(v) = env::var("LOG_ENABLE_LOGTAIL") {
            self.logging.enable_logtail = parse_flag(&v).unwrap_or(self.logging.enable_logtail);
        }

        // Feature overrides
        if let Some(v) = env_first(&["SCD2_USE_V3", "NEXT_PUBLIC_SCD2_USE_V3"]) {
            self.features.scd2_use_v3 = parse_flag(&v).unwrap_or(self.features.scd2_use_v3);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            list: ListConfig {
                default_page_size: 50,
                max_page_size: MAX_PAGE_SIZE,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                scoping_enabled: false,
            },
            logging: LoggingConfig {
                enable_loki: false,
                enable_logtail: false,
                default_filter: "stockroom_api=debug,tower_http=debug,info".to_string(),
            },
            features: FeatureConfig { scd2_use_v3: true },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            list: ListConfig {
                default_page_size: 50,
                max_page_size: MAX_PAGE_SIZE,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                scoping_enabled: true,
            },
            logging: LoggingConfig {
                enable_loki: false,
                enable_logtail: false,
                default_filter: "info".to_string(),
            },
            features: FeatureConfig { scd2_use_v3: true },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            list: ListConfig {
                default_page_size: 50,
                max_page_size: MAX_PAGE_SIZE,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                scoping_enabled: true,
            },
            logging: LoggingConfig {
                enable_loki: false,
                enable_logtail: false,
                default_filter: "info".to_string(),
            },
            features: FeatureConfig { scd2_use_v3: true },
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

/// First of `names` that is set.
fn env_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| env::var(name).ok())
}

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
