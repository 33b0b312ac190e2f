use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Internship {internship_id} has invalid dates: {reason}")]
    InvalidInternshipDates { internship_id: Uuid, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
