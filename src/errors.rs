use crate::workflow::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data not found: {0}")]
    DataNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    #[error("Timed out after {waited_ms}ms waiting for {description}")]
    Timeout { description: String, waited_ms: u64 },

    #[error("Failed to actuate {locator} after {attempts} attempts")]
    ActionExhausted { locator: String, attempts: u32 },

    #[error("{label} not {condition} after wait")]
    NotReady {
        label: String,
        condition: &'static str,
        #[source]
        source: Box<FormError>,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("{stage} section failed: {source}")]
    Section {
        stage: Stage,
        #[source]
        source: Box<FormError>,
    },

    #[error("{stage} section blocked by validation: {}", messages.join("; "))]
    ValidationBlocked { stage: Stage, messages: Vec<String> },

    #[error("Invalid transition from {from}: {reason}")]
    InvalidTransition { from: Stage, reason: String },

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Window error: {0}")]
    WindowError(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormError>;

/// Coarse classification the actuator and wait loop branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ClickIntercepted,
    StaleElement,
    NotInteractable,
    NotFound,
    Timeout,
    Exhausted,
    Other,
}

impl FormError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FormError::ClickIntercepted(_) => FailureKind::ClickIntercepted,
            FormError::StaleElement(_) => FailureKind::StaleElement,
            FormError::NotInteractable(_) => FailureKind::NotInteractable,
            FormError::ElementNotFound(_) => FailureKind::NotFound,
            FormError::Timeout { .. } => FailureKind::Timeout,
            FormError::ActionExhausted { .. } => FailureKind::Exhausted,
            FormError::NotReady { source, .. } | FormError::Section { source, .. } => source.kind(),
            _ => FailureKind::Other,
        }
    }

    /// Wraps a failure with the stage it happened in, unless it already carries one.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            FormError::Section { .. } | FormError::ValidationBlocked { .. } => self,
            other => FormError::Section {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage a failure was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FormError::Section { stage, .. } | FormError::ValidationBlocked { stage, .. } => {
                Some(*stage)
            }
            FormError::InvalidTransition { from, .. } => Some(*from),
            _ => None,
        }
    }

    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        FormError::JavaScriptFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_message_names_the_label() {
        let err = FormError::NotReady {
            label: "Save button".to_string(),
            condition: "visible",
            source: Box::new(FormError::Timeout {
                description: "visible //button[@id='save-btn']".to_string(),
                waited_ms: 30000,
            }),
        };
        assert_eq!(err.to_string(), "Save button not visible after wait");
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_in_stage_does_not_double_wrap() {
        let err = FormError::ElementNotFound("x".into()).in_stage(Stage::Proposal);
        assert_eq!(err.stage(), Some(Stage::Proposal));
        let err = err.in_stage(Stage::Review);
        assert_eq!(err.stage(), Some(Stage::Proposal));
        assert_eq!(err.kind(), FailureKind::NotFound);
    }
}
