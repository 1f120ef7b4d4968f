use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised around the roster: definitions, the store, member import and config.
///
/// Roster generation itself never fails; an under-filled shift is reported
/// through `RosterReport::unfilled` instead.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Invalid scale definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Scale definition not found (id={0})")]
    DefinitionNotFound(String),

    #[error("Scale definition '{0}' already exists")]
    DuplicateDefinition(String),

    #[error("The built-in default definition cannot be removed")]
    DefaultDefinitionLocked,

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Year {0} is outside the supported calendar range")]
    InvalidYear(i32),

    #[error("Invalid month {0}, expected 1-12")]
    InvalidMonth(u32),

    #[error("No roster has been generated for {0}")]
    RosterNotGenerated(i32),

    #[error("Member not found (id={0})")]
    MemberNotFound(String),

    #[error("Roster entry {id} not found in {year}")]
    EntryNotFound { year: i32, id: u64 },

    #[error("Invalid roster entry: {0}")]
    InvalidEntry(String),

    #[error("Member {member_id} already has a shift on {date}")]
    DuplicateShift { member_id: String, date: NaiveDate },

    #[error("Member directory is empty")]
    EmptyDirectory,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RosterError>;

impl ResponseError for RosterError {
    fn status_code(&self) -> StatusCode {
        match self {
            RosterError::DefinitionNotFound(_)
            | RosterError::MemberNotFound(_)
            | RosterError::RosterNotGenerated(_)
            | RosterError::EntryNotFound { .. } => StatusCode::NOT_FOUND,
            RosterError::DuplicateDefinition(_)
            | RosterError::DuplicateShift { .. }
            | RosterError::DefaultDefinitionLocked => StatusCode::CONFLICT,
            RosterError::InvalidDefinition { .. }
            | RosterError::InvalidEntry(_)
            | RosterError::InvalidTime(_)
            | RosterError::InvalidYear(_)
            | RosterError::InvalidMonth(_)
            | RosterError::EmptyDirectory
            | RosterError::Csv(_) => StatusCode::BAD_REQUEST,
            RosterError::Config(_) | RosterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
