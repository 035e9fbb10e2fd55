use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunwayError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown irregular category: {0}")]
    UnknownCategory(String),

    #[error("Unknown recurring schedule: {0}")]
    UnknownSchedule(i64),

    #[error("Unknown frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RunwayError>;
