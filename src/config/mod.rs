use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis (blacklist токенов)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

// Настройки транзакции бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Upper bound on waiting for a contended seat row lock.
    pub lock_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_or("PORT", 8000)?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "cinema_booking=debug,tower_http=debug"),
                log_format: parse_log_format(&var_or("LOG_FORMAT", "pretty"))?,
                request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
                cors_origins: parse_list(&var_or("CORS_ORIGINS", "http://localhost:5173")),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parse_or("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                issuer: var_or("JWT_ISSUER", "cinema-booking"),
                expires_in_minutes: parse_or("JWT_EXPIRES_IN_MINUTES", 15)?,
            },
            auth: AuthConfig {
                bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            },
            booking: BookingConfig {
                lock_timeout_ms: parse_or("BOOKING_LOCK_TIMEOUT_MS", 5000)?,
            },
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        _ => Err(ConfigError::Invalid {
            name: "LOG_FORMAT",
            value: raw.to_string(),
        }),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
