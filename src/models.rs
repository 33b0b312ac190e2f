use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternshipType {
    Kkl,
    Kkn,
}

impl InternshipType {
    pub fn as_str(self) -> &'static str {
        match self {
            InternshipType::Kkl => "kkl",
            InternshipType::Kkn => "kkn",
        }
    }
}

impl FromStr for InternshipType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "kkl" => Ok(InternshipType::Kkl),
            "kkn" => Ok(InternshipType::Kkn),
            other => anyhow::bail!("unknown internship type: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternshipStatus {
    Waiting,
    Accepted,
    Rejected,
}

impl InternshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InternshipStatus::Waiting => "waiting",
            InternshipStatus::Accepted => "accepted",
            InternshipStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for InternshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InternshipStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "waiting" => Ok(InternshipStatus::Waiting),
            "accepted" => Ok(InternshipStatus::Accepted),
            "rejected" => Ok(InternshipStatus::Rejected),
            other => anyhow::bail!("unknown internship status: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ReportStatus::Pending),
            "approved" => Ok(ReportStatus::Approved),
            "rejected" => Ok(ReportStatus::Rejected),
            other => anyhow::bail!("unknown report status: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Advisor {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Internship {
    pub id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub advisor: Option<Advisor>,
    pub internship_type: InternshipType,
    pub company_name: String,
    pub company_address: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: InternshipStatus,
    pub progress_note: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogbookEntry {
    pub id: Uuid,
    pub internship_id: Uuid,
    pub date: NaiveDate,
    pub activity: String,
    pub supervisor_note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub internship_id: Uuid,
    pub file_path: String,
    pub status: ReportStatus,
    pub reviewer_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Accept or reject, shared by internship applications and report reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Decision {
    Accept,
    Reject,
}
