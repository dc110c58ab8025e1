//! Domain types shared by every crate in the workspace.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::OrchestrationError;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Completion percentage of the running stage, `0..=100`.
pub type Percent = u8;

/// Upper bound of a [`Percent`].
pub const MAX_PERCENT: Percent = 100;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Identifies one of the three units of external work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Generates the report artifacts.
    Producer,
    /// Sends the produced artifacts by message.
    Dispatcher,
    /// Writes externally supplied results for one business line.
    TableUpdater,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Dispatcher => "dispatcher",
            Self::TableUpdater => "table_updater",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "producer" => Ok(Self::Producer),
            "dispatcher" => Ok(Self::Dispatcher),
            "table_updater" => Ok(Self::TableUpdater),
            other => Err(OrchestrationError::InvalidArgument(format!(
                "unknown stage: \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// BusinessLine
// ---------------------------------------------------------------------------

/// The category a table update is run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessLine {
    #[serde(rename = "Business Line 1")]
    One,
    #[serde(rename = "Business Line 2")]
    Two,
    #[serde(rename = "Business Line 3")]
    Three,
    #[serde(rename = "Business Line 4")]
    Four,
}

impl BusinessLine {
    /// Every selectable value, in display order.
    pub const ALL: [BusinessLine; 4] = [Self::One, Self::Two, Self::Three, Self::Four];

    pub fn label(&self) -> &'static str {
        match self {
            Self::One => "Business Line 1",
            Self::Two => "Business Line 2",
            Self::Three => "Business Line 3",
            Self::Four => "Business Line 4",
        }
    }
}

impl fmt::Display for BusinessLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BusinessLine {
    type Err = OrchestrationError;

    /// Parse a selector label. Surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.is_empty() {
            return Err(OrchestrationError::InvalidArgument(
                "business line selection must not be empty".to_string(),
            ));
        }
        Self::ALL
            .into_iter()
            .find(|line| line.label() == label)
            .ok_or_else(|| {
                OrchestrationError::InvalidArgument(format!("unknown business line: \"{label}\""))
            })
    }
}

// ---------------------------------------------------------------------------
// ReportPeriod
// ---------------------------------------------------------------------------

/// The reporting period the pipeline produces artifacts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
    /// Date by which recipients must return their results.
    pub deadline: NaiveDate,
}

impl ReportPeriod {
    pub fn new(year: i32, month: u32, deadline: NaiveDate) -> Result<Self, OrchestrationError> {
        Self::check_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(OrchestrationError::InvalidArgument(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        Ok(Self {
            year,
            month,
            deadline,
        })
    }

    /// Reject anything outside `1000..=9999`, negative years included.
    pub fn check_year(year: i32) -> Result<(), OrchestrationError> {
        if (1000..=9999).contains(&year) {
            Ok(())
        } else {
            Err(OrchestrationError::InvalidArgument(format!(
                "year must have four digits, got {year}"
            )))
        }
    }

    /// `YYYY-MM` label used in artifact names.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Execution states
// ---------------------------------------------------------------------------

/// Lifecycle of the two-stage pipeline. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    ProducerRunning,
    ProducerDone,
    DispatcherRunning,
    DispatcherDone,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::ProducerRunning => "producer running",
            Self::ProducerDone => "producer done",
            Self::DispatcherRunning => "dispatcher running",
            Self::DispatcherDone => "dispatcher done",
        })
    }
}

/// Lifecycle of a table update. The selection is captured at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "selection", rename_all = "snake_case")]
pub enum UpdateState {
    #[default]
    Idle,
    Running(BusinessLine),
    Done(BusinessLine),
}

impl UpdateState {
    pub fn selection(&self) -> Option<BusinessLine> {
        match self {
            Self::Idle => None,
            Self::Running(line) | Self::Done(line) => Some(*line),
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running(line) => write!(f, "running for {line}"),
            Self::Done(line) => write!(f, "done for {line}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn business_line_parses_labels() {
        assert_eq!("Business Line 2".parse::<BusinessLine>(), Ok(BusinessLine::Two));
        assert_eq!("  Business Line 4 ".parse::<BusinessLine>(), Ok(BusinessLine::Four));
    }

    #[test]
    fn business_line_rejects_blank_selection() {
        assert_matches!(
            "".parse::<BusinessLine>(),
            Err(OrchestrationError::InvalidArgument(_))
        );
        assert_matches!(
            "   ".parse::<BusinessLine>(),
            Err(OrchestrationError::InvalidArgument(_))
        );
    }

    #[test]
    fn business_line_rejects_unknown_label() {
        let err = "Business Line 9".parse::<BusinessLine>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: unknown business line: \"Business Line 9\""
        );
    }

    #[test]
    fn business_line_serializes_as_label() {
        let json = serde_json::to_string(&BusinessLine::Three).unwrap();
        assert_eq!(json, "\"Business Line 3\"");
    }

    #[test]
    fn stage_round_trips_through_str() {
        for stage in [Stage::Producer, Stage::Dispatcher, Stage::TableUpdater] {
            assert_eq!(stage.as_str().parse::<Stage>(), Ok(stage));
        }
    }

    #[test]
    fn report_period_validates_month() {
        let deadline = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        assert!(ReportPeriod::new(2026, 3, deadline).is_ok());
        assert_matches!(
            ReportPeriod::new(2026, 13, deadline),
            Err(OrchestrationError::InvalidArgument(_))
        );
        assert_matches!(
            ReportPeriod::new(26, 3, deadline),
            Err(OrchestrationError::InvalidArgument(_))
        );
    }

    #[test]
    fn negative_years_are_not_four_digits() {
        assert!(ReportPeriod::check_year(2026).is_ok());
        assert_matches!(
            ReportPeriod::check_year(-999),
            Err(OrchestrationError::InvalidArgument(_))
        );
        assert_matches!(
            ReportPeriod::check_year(-2026),
            Err(OrchestrationError::InvalidArgument(_))
        );
    }

    #[test]
    fn report_period_label_is_zero_padded() {
        let deadline = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let period = ReportPeriod::new(2026, 1, deadline).unwrap();
        assert_eq!(period.label(), "2026-01");
    }

    #[test]
    fn update_state_exposes_captured_selection() {
        assert_eq!(UpdateState::Idle.selection(), None);
        assert_eq!(
            UpdateState::Running(BusinessLine::One).selection(),
            Some(BusinessLine::One)
        );
        assert_eq!(UpdateState::Done(BusinessLine::Two).to_string(), "done for Business Line 2");
    }
}
