//! Subtrip status timeline
//!
//! A subtrip moves `in-queue → loaded → received → billed`. A subtrip that
//! was received with a discrepancy sits in `error` until it is resolved; on
//! the timeline that shows as a failed `received` step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtripStatus {
    InQueue,
    Loaded,
    Received,
    Error,
    Billed,
}

/// Main path, in order
const MAIN_PATH: [SubtripStatus; 4] = [
    SubtripStatus::InQueue,
    SubtripStatus::Loaded,
    SubtripStatus::Received,
    SubtripStatus::Billed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Completed,
    Current,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub status: SubtripStatus,
    pub state: StepState,
}

impl SubtripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtripStatus::InQueue => "in-queue",
            SubtripStatus::Loaded => "loaded",
            SubtripStatus::Received => "received",
            SubtripStatus::Error => "error",
            SubtripStatus::Billed => "billed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubtripStatus::InQueue => "In Queue",
            SubtripStatus::Loaded => "Loaded",
            SubtripStatus::Received => "Received",
            SubtripStatus::Error => "Error",
            SubtripStatus::Billed => "Billed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubtripStatus::Billed)
    }

    /// Position on the main path; `error` occupies the `received` slot
    fn position(&self) -> usize {
        match self {
            SubtripStatus::InQueue => 0,
            SubtripStatus::Loaded => 1,
            SubtripStatus::Received | SubtripStatus::Error => 2,
            SubtripStatus::Billed => 3,
        }
    }

    /// Timeline steps for rendering the subtrip's progress
    pub fn timeline(&self) -> Vec<TimelineStep> {
        let current = self.position();

        MAIN_PATH
            .iter()
            .enumerate()
            .map(|(index, status)| {
                let state = if index < current {
                    StepState::Completed
                } else if index > current {
                    StepState::Pending
                } else if *self == SubtripStatus::Error {
                    StepState::Failed
                } else if self.is_terminal() {
                    StepState::Completed
                } else {
                    StepState::Current
                };
                TimelineStep {
                    status: *status,
                    state,
                }
            })
            .collect()
    }
}

impl fmt::Display for SubtripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtripStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "in-queue" | "inqueue" => Ok(SubtripStatus::InQueue),
            "loaded" => Ok(SubtripStatus::Loaded),
            "received" => Ok(SubtripStatus::Received),
            "error" => Ok(SubtripStatus::Error),
            "billed" => Ok(SubtripStatus::Billed),
            other => Err(Error::InvalidRecord(format!(
                "unknown subtrip status '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(status: SubtripStatus) -> Vec<StepState> {
        status.timeline().into_iter().map(|s| s.state).collect()
    }

    #[test]
    fn test_in_queue_timeline() {
        assert_eq!(
            states(SubtripStatus::InQueue),
            vec![
                StepState::Current,
                StepState::Pending,
                StepState::Pending,
                StepState::Pending
            ]
        );
    }

    #[test]
    fn test_error_marks_received_failed() {
        let timeline = SubtripStatus::Error.timeline();
        assert_eq!(timeline[2].status, SubtripStatus::Received);
        assert_eq!(timeline[2].state, StepState::Failed);
        assert_eq!(timeline[1].state, StepState::Completed);
        assert_eq!(timeline[3].state, StepState::Pending);
    }

    #[test]
    fn test_billed_is_fully_completed() {
        assert!(
            states(SubtripStatus::Billed)
                .iter()
                .all(|s| *s == StepState::Completed)
        );
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("In_Queue".parse::<SubtripStatus>().unwrap(), SubtripStatus::InQueue);
        assert_eq!(
            serde_json::from_str::<SubtripStatus>("\"in-queue\"").unwrap(),
            SubtripStatus::InQueue
        );
        assert!("lost".parse::<SubtripStatus>().is_err());
    }
}
