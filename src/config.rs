use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::domain::solver_factory::SolverType;
use crate::error::{Error, Result};

/// How the binaries print their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(Error::Config(format!("unknown report format {}", other))),
        }
    }
}

/// Parameters of the seeded distribution instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceConfig {
    pub seed: u64,
    pub producers: usize,
    pub relays: usize,
    pub consumers: usize,
    pub vehicles: usize,
    pub supply_range: (i32, i32),
    pub demand_range: (i32, i32),
    pub distance_range: (i32, i32),
    pub vehicle_capacity: i32,
    pub vehicle_cost: i32,
    pub horizon: usize,
    pub max_distance: i32,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        InstanceConfig {
            seed: 1,
            producers: 5,
            relays: 10,
            consumers: 500,
            vehicles: 500,
            supply_range: (500, 1000),
            demand_range: (50, 100),
            distance_range: (10, 50),
            vehicle_capacity: 50,
            vehicle_cost: 4,
            horizon: 10,
            max_distance: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub solver: SolverType,
    pub stage1_time_limit: Option<Duration>,
    pub stage2_time_limit: Option<Duration>,
    pub report_format: ReportFormat,
    pub instance: InstanceConfig,
}

impl AppConfig {
    /// Read configuration from the process environment (call `dotenv()` first to honour `.env`).
    pub fn from_env() -> Result<Self> {
        let defaults = InstanceConfig::default();

        let solver = match env::var("SOLVER") {
            Ok(name) => SolverType::from_str(&name)
                .ok_or_else(|| Error::Config(format!("unknown or disabled solver {}", name)))?,
            Err(_) => SolverType::default(),
        };

        let report_format = match env::var("REPORT_FORMAT") {
            Ok(format) => format.parse()?,
            Err(_) => ReportFormat::default(),
        };

        let instance = InstanceConfig {
            seed: env_or("DISTRIBUTION_SEED", defaults.seed)?,
            producers: env_or("PRODUCERS", defaults.producers)?,
            relays: env_or("RELAYS", defaults.relays)?,
            consumers: env_or("CONSUMERS", defaults.consumers)?,
            vehicles: env_or("VEHICLES", defaults.vehicles)?,
            vehicle_capacity: env_or("VEHICLE_CAPACITY", defaults.vehicle_capacity)?,
            vehicle_cost: env_or("VEHICLE_COST", defaults.vehicle_cost)?,
            horizon: env_or("HORIZON", defaults.horizon)?,
            max_distance: env_or("MAX_DISTANCE", defaults.max_distance)?,
            ..defaults
        };

        Ok(AppConfig {
            solver,
            stage1_time_limit: time_limit("STAGE1_TIME_LIMIT_SECS")?,
            stage2_time_limit: time_limit("STAGE2_TIME_LIMIT_SECS")?,
            report_format,
            instance,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{}={} is not a valid value", key, raw))),
        Err(_) => Ok(default),
    }
}

fn time_limit(key: &str) -> Result<Option<Duration>> {
    match env::var(key) {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .ok_or_else(|| Error::Config(format!("{}={} is not a positive number of seconds", key, raw)))?;
            Ok(Some(Duration::from_secs_f64(secs)))
        }
        Err(_) => Ok(None),
    }
}
