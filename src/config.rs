use anyhow::Context;
use serde::Deserialize;
use time::{macros::format_description, UtcOffset};

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Settings for the daily search quota.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Offset used to decide which calendar day "today" is.
    pub utc_offset: UtcOffset,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            utc_offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub quota: QuotaConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipehub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "recipehub-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let quota = match std::env::var("SEARCH_QUOTA_UTC_OFFSET") {
            Ok(raw) => QuotaConfig {
                utc_offset: parse_utc_offset(&raw)?,
            },
            Err(_) => QuotaConfig::default(),
        };
        Ok(Self {
            database_url,
            jwt,
            quota,
        })
    }
}

/// Parses offsets like `+05:30`, `-03:00` or `Z`.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        raw,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .with_context(|| format!("invalid SEARCH_QUOTA_UTC_OFFSET {raw:?}"))
}
