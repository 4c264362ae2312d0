use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// An expected page element never became available: the site layout
    /// changed, the firm is unknown, a dropdown lacks the requested option,
    /// or the connection dropped.
    #[error("navigation failed at '{step}': {detail}")]
    Navigation { step: String, detail: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("browser session already closed")]
    SessionClosed,
}

impl ScrapeError {
    pub fn navigation(step: impl Into<String>, detail: impl ToString) -> Self {
        ScrapeError::Navigation {
            step: step.into(),
            detail: detail.to_string(),
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, ScrapeError::Navigation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
