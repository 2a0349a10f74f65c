//! When a similarity report should be (re)generated.

use db::models::plagiarism_submission::{Model, SubmissionStatus};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Report generation mode chosen per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportGenerationMode {
    /// Generate as soon as the content is uploaded.
    #[default]
    Immediate,
    /// Generate on upload, then once more at the due date.
    ImmediateAndDueDate,
    /// Generate only once the due date has been reached.
    DueDate,
}

impl fmt::Display for ReportGenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportGenerationMode::Immediate => "immediate",
            ReportGenerationMode::ImmediateAndDueDate => "immediate_and_due_date",
            ReportGenerationMode::DueDate => "due_date",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReportGenerationMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" | "0" => Ok(ReportGenerationMode::Immediate),
            "immediate_and_due_date" | "1" => Ok(ReportGenerationMode::ImmediateAndDueDate),
            "due_date" | "2" => Ok(ReportGenerationMode::DueDate),
            other => Err(format!("invalid ReportGenerationMode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSchedule {
    pub to_generate: bool,
    pub generation_time: i64,
}

impl GenerationSchedule {
    fn now(to_generate: bool, now: i64) -> Self {
        Self {
            to_generate,
            generation_time: now,
        }
    }
}

/// Decides whether a report still has to be generated and the earliest time
/// it may be requested.
///
/// `due_date` of zero means the content has no due date. `already_generated`
/// is true once a report has been retrieved for the submission.
pub fn schedule(
    mode: ReportGenerationMode,
    status: SubmissionStatus,
    due_date: i64,
    already_generated: bool,
    now: i64,
) -> GenerationSchedule {
    if status.is_terminal() {
        return GenerationSchedule::now(false, now);
    }

    let due_date = if due_date > 0 { due_date } else { now };

    match mode {
        ReportGenerationMode::Immediate => GenerationSchedule::now(!already_generated, now),
        ReportGenerationMode::DueDate if !already_generated => GenerationSchedule {
            to_generate: true,
            generation_time: due_date.max(now),
        },
        ReportGenerationMode::DueDate => GenerationSchedule::now(false, now),
        ReportGenerationMode::ImmediateAndDueDate if !already_generated => {
            GenerationSchedule::now(true, now)
        }
        // A second report at the due date, unless that has already passed.
        ReportGenerationMode::ImmediateAndDueDate if due_date > now => GenerationSchedule {
            to_generate: true,
            generation_time: due_date,
        },
        ReportGenerationMode::ImmediateAndDueDate => GenerationSchedule::now(false, now),
    }
}

/// Generation is pending for `model` and its earliest time has come.
pub fn is_due(model: &Model, now: i64) -> bool {
    model.to_generate && model.generation_time <= now
}
