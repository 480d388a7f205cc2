use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::notifications::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub starttls: bool,
}

#[derive(Clone, Debug)]
pub enum MailBackend {
    Console,
    Smtp(SmtpConfig),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub mail_backend: MailBackend,
    pub default_from_email: String,
    pub retry_policy: RetryPolicy,
}

impl Config {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://todo.db?mode=rwc".to_string());
        let bind_addr = parse_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        let access_secs: i64 = parse_or("ACCESS_TOKEN_TTL_SECS", 300)?;
        let refresh_secs: i64 = parse_or("REFRESH_TOKEN_TTL_SECS", 86_400)?;

        let mail_backend = match env::var("MAIL_BACKEND")
            .unwrap_or_else(|_| "console".to_string())
            .as_str()
        {
            "console" => MailBackend::Console,
            "smtp" => MailBackend::Smtp(SmtpConfig {
                host: env::var("SMTP_HOST").map_err(|_| ConfigError::Missing("SMTP_HOST"))?,
                port: parse_or("SMTP_PORT", 587)?,
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                starttls: parse_or("SMTP_STARTTLS", true)?,
            }),
            other => {
                return Err(ConfigError::Invalid {
                    name: "MAIL_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let default_from_email = env::var("DEFAULT_FROM_EMAIL")
            .unwrap_or_else(|_| "webmaster@localhost".to_string());

        let max_attempts: u32 = parse_or("NOTIFY_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "NOTIFY_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let backoff_ms: u64 = parse_or("NOTIFY_RETRY_BACKOFF_MS", 500)?;

        Ok(Self {
            database_url,
            bind_addr,
            jwt_secret,
            access_token_ttl: chrono::Duration::seconds(access_secs),
            refresh_token_ttl: chrono::Duration::seconds(refresh_secs),
            mail_backend,
            default_from_email,
            retry_policy: RetryPolicy {
                max_attempts,
                initial_backoff: Duration::from_millis(backoff_ms),
            },
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
