use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CompletionError;
use crate::models::{Internship, LogbookEntry, Report, ReportStatus};

/// Display label of an internship's real-world completion, recomputed on
/// every call and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompletionStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Awaiting Report Approval")]
    AwaitingReportApproval,
    #[serde(rename = "Logbook Incomplete")]
    LogbookIncomplete,
    #[serde(rename = "Complete")]
    Complete,
}

impl CompletionStatus {
    /// Rule order; the first matching rule wins.
    pub const ALL: [CompletionStatus; 4] = [
        CompletionStatus::InProgress,
        CompletionStatus::AwaitingReportApproval,
        CompletionStatus::LogbookIncomplete,
        CompletionStatus::Complete,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CompletionStatus::InProgress => "In Progress",
            CompletionStatus::AwaitingReportApproval => "Awaiting Report Approval",
            CompletionStatus::LogbookIncomplete => "Logbook Incomplete",
            CompletionStatus::Complete => "Complete",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only view over the logbook and report rows of internships.
pub trait CompletionRecords {
    fn count_logbooks_in_range(&self, internship_id: Uuid, start: NaiveDate, end: NaiveDate) -> u64;

    fn has_approved_report(&self, internship_id: Uuid) -> bool;
}

/// One internship with every logbook and report row it owns.
#[derive(Debug, Clone)]
pub struct InternshipRecords {
    pub internship: Internship,
    pub logbooks: Vec<LogbookEntry>,
    pub reports: Vec<Report>,
}

impl CompletionRecords for InternshipRecords {
    fn count_logbooks_in_range(
        &self,
        internship_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> u64 {
        self.logbooks
            .iter()
            .filter(|entry| entry.internship_id == internship_id)
            .filter(|entry| entry.date >= start && entry.date <= end)
            .count() as u64
    }

    fn has_approved_report(&self, internship_id: Uuid) -> bool {
        self.reports.iter().any(|report| {
            report.internship_id == internship_id && report.status == ReportStatus::Approved
        })
    }
}

/// Counts aggregated by the database over the internship's own date range.
#[derive(Debug, Clone)]
pub struct CompletionSnapshot {
    pub internship: Internship,
    pub logbook_count: u64,
    pub has_approved_report: bool,
}

impl CompletionRecords for CompletionSnapshot {
    fn count_logbooks_in_range(&self, internship_id: Uuid, _start: NaiveDate, _end: NaiveDate) -> u64 {
        if internship_id == self.internship.id {
            self.logbook_count
        } else {
            0
        }
    }

    fn has_approved_report(&self, internship_id: Uuid) -> bool {
        internship_id == self.internship.id && self.has_approved_report
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvaluation {
    pub internship: Internship,
    pub status: CompletionStatus,
    pub logged_days: u64,
    pub required_days: i64,
}

impl CompletionEvaluation {
    pub fn missing_days(&self) -> i64 {
        (self.required_days - self.logged_days as i64).max(0)
    }
}

#[derive(Debug, Clone)]
pub struct InvalidRecord {
    pub internship: Internship,
    pub error: CompletionError,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationBatch {
    pub evaluations: Vec<CompletionEvaluation>,
    pub invalid: Vec<InvalidRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSummary {
    pub status: CompletionStatus,
    pub count: usize,
}

pub fn inclusive_day_span(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn evaluation_date(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}

pub fn internship_dates(internship: &Internship) -> Result<(NaiveDate, NaiveDate), CompletionError> {
    let start = internship
        .start_date
        .ok_or_else(|| invalid_dates(internship, "missing start date"))?;
    let end = internship
        .end_date
        .ok_or_else(|| invalid_dates(internship, "missing end date"))?;

    Ok((start, end))
}

fn invalid_dates(internship: &Internship, reason: &str) -> CompletionError {
    CompletionError::InvalidInternshipDates {
        internship_id: internship.id,
        reason: reason.to_string(),
    }
}

pub fn evaluate_completion<R>(
    internship: &Internship,
    records: &R,
    today: NaiveDate,
) -> Result<CompletionStatus, CompletionError>
where
    R: CompletionRecords + ?Sized,
{
    let (start, end) = internship_dates(internship)?;

    if end > today {
        return Ok(CompletionStatus::InProgress);
    }

    // Reversed ranges only matter once the period is over.
    if end < start {
        return Err(invalid_dates(internship, "end date precedes start date"));
    }

    if !records.has_approved_report(internship.id) {
        return Ok(CompletionStatus::AwaitingReportApproval);
    }

    let logged = records.count_logbooks_in_range(internship.id, start, end);
    if (logged as i64) < inclusive_day_span(start, end) {
        return Ok(CompletionStatus::LogbookIncomplete);
    }

    Ok(CompletionStatus::Complete)
}

/// Evaluates one internship and keeps the coverage numbers shown by reports.
pub fn evaluate_detailed<R>(
    internship: &Internship,
    records: &R,
    today: NaiveDate,
) -> Result<CompletionEvaluation, CompletionError>
where
    R: CompletionRecords + ?Sized,
{
    let status = evaluate_completion(internship, records, today)?;
    let (start, end) = internship_dates(internship)?;

    let (logged_days, required_days) = if end < start {
        (0, 0)
    } else {
        (
            records.count_logbooks_in_range(internship.id, start, end),
            inclusive_day_span(start, end),
        )
    };

    Ok(CompletionEvaluation {
        internship: internship.clone(),
        status,
        logged_days,
        required_days,
    })
}

pub fn evaluate_snapshots(snapshots: &[CompletionSnapshot], today: NaiveDate) -> EvaluationBatch {
    let mut batch = EvaluationBatch::default();

    for snapshot in snapshots {
        match evaluate_detailed(&snapshot.internship, snapshot, today) {
            Ok(evaluation) => {
                debug!(
                    internship = %snapshot.internship.id,
                    status = %evaluation.status,
                    "internship evaluated"
                );
                batch.evaluations.push(evaluation);
            }
            Err(error) => {
                warn!(internship = %snapshot.internship.id, %error, "skipping internship");
                batch.invalid.push(InvalidRecord {
                    internship: snapshot.internship.clone(),
                    error,
                });
            }
        }
    }

    batch
}

pub fn summarize_completion(evaluations: &[CompletionEvaluation]) -> Vec<CompletionSummary> {
    CompletionStatus::ALL
        .iter()
        .map(|&status| CompletionSummary {
            status,
            count: evaluations.iter().filter(|e| e.status == status).count(),
        })
        .collect()
}
