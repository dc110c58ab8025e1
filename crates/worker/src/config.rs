use std::time::Duration;

use chrono::NaiveDate;
use kri_core::types::{BusinessLine, ReportPeriod, Stage};

/// Default number of reports the simulated producer generates.
const DEFAULT_REPORT_COUNT: usize = 5;

/// Default simulated effort per report, in milliseconds.
const DEFAULT_STEP_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Knobs of the simulated collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub report_count: usize,
    pub step: Duration,
    /// Stage forced to fault, for exercising failure handling.
    pub fail_stage: Option<Stage>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            report_count: DEFAULT_REPORT_COUNT,
            step: Duration::from_millis(DEFAULT_STEP_MS),
            fail_stage: None,
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub period: ReportPeriod,
    /// When set, a table update for this line runs alongside the pipeline.
    pub business_line: Option<BusinessLine>,
    pub simulation: SimulationConfig,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var            | Default |
    /// |--------------------|---------|
    /// | `REPORT_YEAR`      | required, e.g. `2026` |
    /// | `REPORT_MONTH`     | required, `1`-`12` |
    /// | `REPORT_DEADLINE`  | required, `YYYY-MM-DD` |
    /// | `BUSINESS_LINE`    | unset, e.g. `Business Line 2` |
    /// | `SIM_REPORT_COUNT` | `5` |
    /// | `SIM_STEP_MS`      | `200` |
    /// | `SIM_FAIL_STAGE`   | unset, `producer`, `dispatcher` or `table_updater` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let year: i32 = parse(require("REPORT_YEAR")?, "REPORT_YEAR")?;
        ReportPeriod::check_year(year).map_err(|e| invalid("REPORT_YEAR", e))?;
        let month: u32 = parse(require("REPORT_MONTH")?, "REPORT_MONTH")?;
        let deadline = NaiveDate::parse_from_str(&require("REPORT_DEADLINE")?, "%Y-%m-%d")
            .map_err(|e| invalid("REPORT_DEADLINE", e))?;
        // Year is already valid, so only the month can fail here.
        let period =
            ReportPeriod::new(year, month, deadline).map_err(|e| invalid("REPORT_MONTH", e))?;

        let business_line = get("BUSINESS_LINE")
            .map(|v| v.parse::<BusinessLine>())
            .transpose()
            .map_err(|e| invalid("BUSINESS_LINE", e))?;

        let defaults = SimulationConfig::default();
        let simulation = SimulationConfig {
            report_count: get("SIM_REPORT_COUNT")
                .map(|v| parse::<usize>(v, "SIM_REPORT_COUNT"))
                .transpose()?
                .unwrap_or(defaults.report_count),
            step: get("SIM_STEP_MS")
                .map(|v| parse::<u64>(v, "SIM_STEP_MS"))
                .transpose()?
                .map(Duration::from_millis)
                .unwrap_or(defaults.step),
            fail_stage: get("SIM_FAIL_STAGE")
                .map(|v| v.parse::<Stage>())
                .transpose()
                .map_err(|e| invalid("SIM_FAIL_STAGE", e))?,
        };

        Ok(Self {
            period,
            business_line,
            simulation,
        })
    }
}

fn parse<T>(value: String, name: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| invalid(name, e))
}

fn invalid(name: &'static str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}
