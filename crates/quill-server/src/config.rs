use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use quill_mail::SmtpSettings;

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub remember_me_token_ttl: Duration,
    pub signup_code_ttl: Duration,
    pub auth_header: String,
    pub redis_url: Option<String>,
    /// Set only when host, user, password and sender are all present.
    pub smtp: Option<SmtpSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| {
            get(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let jwt_secret = get("QUILL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("QUILL_JWT_SECRET is unset or still a placeholder");
        }

        let port = or_default("QUILL_PORT", "8080")
            .parse()
            .context("QUILL_PORT must be a port number")?;

        let smtp = match (
            get("QUILL_SMTP_HOST"),
            get("QUILL_SMTP_USER"),
            get("QUILL_SMTP_PASSWORD"),
            get("QUILL_SMTP_SENDER"),
        ) {
            (Some(host), Some(username), Some(password), Some(sender)) => Some(SmtpSettings {
                host,
                port: or_default("QUILL_SMTP_PORT", "587")
                    .parse()
                    .context("QUILL_SMTP_PORT must be a port number")?,
                username,
                password,
                sender,
            }),
            _ => None,
        };

        Ok(Self {
            host: or_default("QUILL_HOST", "0.0.0.0"),
            port,
            db_path: or_default("QUILL_DB_PATH", "quill.db").into(),
            jwt_secret,
            access_token_ttl: duration(&or_default("QUILL_ACCESS_TOKEN_TTL", "12h"))
                .context("QUILL_ACCESS_TOKEN_TTL")?,
            remember_me_token_ttl: duration(&or_default("QUILL_REMEMBER_ME_TOKEN_TTL", "100h"))
                .context("QUILL_REMEMBER_ME_TOKEN_TTL")?,
            signup_code_ttl: duration(&or_default("QUILL_SIGNUP_CODE_TTL", "10m"))
                .context("QUILL_SIGNUP_CODE_TTL")?,
            auth_header: or_default("QUILL_AUTH_HEADER", "Authorization"),
            redis_url: get("QUILL_REDIS_URL"),
            smtp,
        })
    }
}

/// `90`, `90s`, `15m`, `12h` or `7d`.
pub fn duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: u64 = digits
        .parse()
        .with_context(|| format!("invalid duration '{raw}'"))?;
    let scale = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => bail!("unknown duration unit '{other}' in '{raw}'"),
    };
    let secs = value
        .checked_mul(scale)
        .with_context(|| format!("duration '{raw}' is too large"))?;

    if secs == 0 {
        bail!("duration '{raw}' must be positive");
    }
    Ok(Duration::from_secs(secs))
}
