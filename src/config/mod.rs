use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in {1:?}")]
    Missing(&'static str, Environment),

    #[error("DATABASE_URL is required for the postgres store backend")]
    DatabaseUrlMissing,

    #[error("Invalid ADMIN_VERIFY_BASE_URL '{0}'")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
    pub email: EmailConfig,
    pub presence: PresenceConfig,
    pub paddock: PaddockConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub require_https: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub challenge_ttl_secs: i64,
    pub per_user_hourly_limit: u64,
    pub global_hourly_limit: u64,
    pub verify_base_url: String,
    pub cookie_max_age_secs: i64,
    /// Users first seen with one of these emails are created as admins.
    pub bootstrap_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub graph_endpoint: String,
    pub sender: String,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    pub session_timeout_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddockConfig {
    /// RSS or Atom feeds read for newsletter stories, in priority order.
    pub news_feeds: Vec<String>,
    pub stories_per_feed: usize,
}

pub const DEFAULT_NEWS_FEEDS: &[&str] = &[
    "https://www.planetf1.com/feed",
    "https://feeds.bbci.co.uk/sport/formula1/rss.xml",
    "https://www.skysports.com/rss/12040",
    "https://www.gpblog.com/en/rss/index.xml",
    "https://www.motorsportweek.com/feed/",
    "https://racer.com/f1/feed/",
];

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
        // Database overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" => self.database.backend = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = env::var("PRIX_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }

        // Admin overrides
        if let Ok(v) = env::var("ADMIN_CHALLENGE_TTL_SECS") {
            self.admin.challenge_ttl_secs = v.parse().unwrap_or(self.admin.challenge_ttl_secs);
        }
        if let Ok(v) = env::var("ADMIN_PER_USER_HOURLY_LIMIT") {
            self.admin.per_user_hourly_limit = v.parse().unwrap_or(self.admin.per_user_hourly_limit);
        }
        if let Ok(v) = env::var("ADMIN_GLOBAL_HOURLY_LIMIT") {
            self.admin.global_hourly_limit = v.parse().unwrap_or(self.admin.global_hourly_limit);
        }
        if let Ok(v) = env::var("ADMIN_VERIFY_BASE_URL") {
            self.admin.verify_base_url = v;
        }
        if let Ok(v) = env::var("ADMIN_COOKIE_MAX_AGE_SECS") {
            self.admin.cookie_max_age_secs = v.parse().unwrap_or(self.admin.cookie_max_age_secs);
        }

        if let Ok(v) = env::var("ADMIN_BOOTSTRAP_EMAILS") {
            self.admin.bootstrap_emails = v
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Email overrides
        if let Ok(v) = env::var("GRAPH_SENDMAIL_ENDPOINT") {
            self.email.graph_endpoint = v;
        }
        if let Ok(v) = env::var("EMAIL_SENDER") {
            self.email.sender = v;
        }
        if let Ok(v) = env::var("GRAPH_ACCESS_TOKEN") {
            self.email.access_token = Some(v).filter(|t| !t.is_empty());
        }

        // Presence overrides
        if let Ok(v) = env::var("PRESENCE_SESSION_TIMEOUT_SECS") {
            self.presence.session_timeout_secs = v.parse().unwrap_or(self.presence.session_timeout_secs);
        }

        // Paddock overrides
        if let Ok(v) = env::var("PADDOCK_NEWS_FEEDS") {
            self.paddock.news_feeds = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("PADDOCK_STORIES_PER_FEED") {
            self.paddock.stories_per_feed = v.parse().unwrap_or(self.paddock.stories_per_feed);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: "prix-six-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:9002".to_string()],
                require_https: false,
            },
            admin: AdminConfig {
                challenge_ttl_secs: 10 * 60,
                per_user_hourly_limit: 5,
                global_hourly_limit: 50,
                verify_base_url: "http://localhost:9002".to_string(),
                cookie_max_age_secs: 60 * 60,
                bootstrap_emails: Vec::new(),
            },
            email: EmailConfig {
                graph_endpoint: "https://graph.microsoft.com/v1.0/users/{sender}/sendMail".to_string(),
                sender: "noreply@localhost".to_string(),
                access_token: None,
            },
            presence: PresenceConfig {
                session_timeout_secs: 5 * 60,
            },
            paddock: PaddockConfig {
                news_feeds: DEFAULT_NEWS_FEEDS.iter().map(|f| f.to_string()).collect(),
                stories_per_feed: 8,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database = DatabaseConfig {
            backend: StoreBackend::Postgres,
            url: None,
            max_connections: 10,
            connection_timeout: 10,
        };
        config.security.jwt_secret = String::new();
        config.security.jwt_expiry_hours = 24;
        config.security.cors_origins = vec!["https://staging.prixsix.com".to_string()];
        config.security.require_https = true;
        config.admin.per_user_hourly_limit = 3;
        config.admin.global_hourly_limit = 20;
        config.admin.verify_base_url = "https://staging.prixsix.com".to_string();
        config.email.sender = "noreply@prixsix.com".to_string();
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 20;
        config.database.connection_timeout = 5;
        config.security.jwt_expiry_hours = 4;
        config.security.cors_origins = vec!["https://prixsix.com".to_string()];
        config.admin.verify_base_url = "https://prixsix.com".to_string();
        config
    }

    /// Rejects configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET", self.environment));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::DatabaseUrlMissing);
        }
        if url::Url::parse(&self.admin.verify_base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(self.admin.verify_base_url.clone()));
        }
        Ok(())
    }

    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin.bootstrap_emails.iter().any(|e| *e == email)
    }

    /// Graph sendMail URL with the sender substituted in.
    pub fn graph_send_url(&self) -> String {
        self.email.graph_endpoint.replace("{sender}", &self.email.sender)
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
