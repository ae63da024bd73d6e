use crate::constants::*;
use std::env;
use std::time::Duration;
use time::{Time, UtcOffset};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub run_migrations: bool,
    pub optimizer: OptimizerConfig,
    pub route: RouteConfig,
}

/// Settings for the enhanced (reasoning-backed) optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Credential for the chat-completions backend. `None` means the
    /// optimizer is unconfigured and the deterministic fallback is served.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Per-attempt timeout. A timeout counts as a failed call.
    pub timeout: Duration,
    /// Retries after the first failed attempt (clamped to `MAX_OPTIMIZER_RETRIES`).
    pub max_retries: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_OPTIMIZER_TIMEOUT_SECS),
            max_retries: DEFAULT_OPTIMIZER_MAX_RETRIES,
        }
    }
}

impl OptimizerConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let timeout_secs: u64 = env::var("OPTIMIZER_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_OPTIMIZER_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid OPTIMIZER_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            return Err("OPTIMIZER_TIMEOUT_SECS must be greater than 0".to_string());
        }

        let max_retries: u32 = env::var("OPTIMIZER_MAX_RETRIES")
            .unwrap_or_else(|_| defaults.max_retries.to_string())
            .parse()
            .map_err(|_| "Invalid OPTIMIZER_MAX_RETRIES")?;

        Ok(Self {
            // An empty key is treated the same as a missing one
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            timeout: Duration::from_secs(timeout_secs),
            max_retries: max_retries.min(MAX_OPTIMIZER_RETRIES),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

/// Tuning knobs for the routing core.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    /// Work time budgeted per horse at each stop
    pub work_minutes_per_horse: u32,

    /// Travel heuristic applied to haversine distance
    pub travel_minutes_per_km: f64,

    /// Start of the working day, used by the fallback schedule
    pub day_start: Time,

    /// Spacing between stops in the fallback schedule
    pub fallback_interval_minutes: u32,

    /// Offset in which a calendar day is cut into `[00:00, 24:00)`
    pub utc_offset: UtcOffset,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            work_minutes_per_horse: DEFAULT_WORK_MINUTES_PER_HORSE,
            travel_minutes_per_km: DEFAULT_TRAVEL_MINUTES_PER_KM,
            day_start: Time::from_hms(DEFAULT_DAY_START_HOUR, 0, 0).unwrap_or(Time::MIDNIGHT),
            fallback_interval_minutes: DEFAULT_FALLBACK_INTERVAL_MINUTES,
            utc_offset: UtcOffset::UTC,
        }
    }
}

impl RouteConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let work_minutes_per_horse: u32 = env::var("ROUTE_WORK_MINUTES_PER_HORSE")
            .unwrap_or_else(|_| defaults.work_minutes_per_horse.to_string())
            .parse()
            .map_err(|_| "Invalid ROUTE_WORK_MINUTES_PER_HORSE")?;
        if work_minutes_per_horse == 0 {
            return Err("ROUTE_WORK_MINUTES_PER_HORSE must be greater than 0".to_string());
        }

        let travel_minutes_per_km: f64 = env::var("ROUTE_TRAVEL_MINUTES_PER_KM")
            .unwrap_or_else(|_| defaults.travel_minutes_per_km.to_string())
            .parse()
            .map_err(|_| "Invalid ROUTE_TRAVEL_MINUTES_PER_KM")?;
        if !travel_minutes_per_km.is_finite() || travel_minutes_per_km < 0.0 {
            return Err("ROUTE_TRAVEL_MINUTES_PER_KM must be a non-negative number".to_string());
        }

        let day_start = match env::var("ROUTE_DAY_START") {
            Ok(raw) => parse_hh_mm(&raw).ok_or("Invalid ROUTE_DAY_START (expected HH:MM)")?,
            Err(_) => defaults.day_start,
        };

        let utc_offset_hours: i8 = env::var("ROUTE_UTC_OFFSET_HOURS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| "Invalid ROUTE_UTC_OFFSET_HOURS")?;
        let utc_offset = UtcOffset::from_hms(utc_offset_hours, 0, 0)
            .map_err(|_| "ROUTE_UTC_OFFSET_HOURS must be between -25 and 25")?;

        Ok(Self {
            work_minutes_per_horse,
            travel_minutes_per_km,
            day_start,
            fallback_interval_minutes: env::var("ROUTE_FALLBACK_INTERVAL_MINUTES")
                .unwrap_or_else(|_| defaults.fallback_interval_minutes.to_string())
                .parse()
                .map_err(|_| "Invalid ROUTE_FALLBACK_INTERVAL_MINUTES")?,
            utc_offset,
        })
    }
}

/// Parse a wall-clock time written as `HH:MM`.
pub fn parse_hh_mm(raw: &str) -> Option<Time> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let hours: u8 = hours.parse().ok()?;
    let minutes: u8 = minutes.parse().ok()?;
    Time::from_hms(hours, minutes, 0).ok()
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            run_migrations: env::var("RUN_MIGRATIONS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| "Invalid RUN_MIGRATIONS (expected true or false)")?,
            optimizer: OptimizerConfig::from_env()?,
            route: RouteConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
