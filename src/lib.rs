//! # eoka-steps
//!
//! Element resolution and action dispatch for browser test steps.
//!
//! A test step names an action, a free-form recognition criterion and an
//! optional parameter list. The [`Session`] turns the criterion into a
//! [`CriterionSpec`], finds the element (structured locator, then label
//! anchors, then every embedded frame), wraps the nth match in a typed
//! [`Component`] and runs the keyword from that kind's action table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eoka_steps::{ComponentKind, Driver, Session, Settings};
//!
//! # async fn demo<D: Driver>(driver: D) -> eoka_steps::Result<()> {
//! let mut session = Session::new(driver, Settings::default());
//! session.start().await?;
//! session
//!     .perform(ComponentKind::CheckBox, "Check", "\"Allow Multiple Select\"", 1, &[])
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod component;
mod criteria;
mod dispatch;
mod driver;
mod frames;
mod handlers;
pub mod keys;
mod locator;
mod report;
mod search;
mod settings;
mod types;

#[cfg(test)]
mod mock;

pub use cache::{CachedComponent, ComponentCache};
pub use component::Component;
pub use criteria::{CriterionSpec, Fingerprint, PARENT_CHILD_SEPARATOR};
pub use dispatch::{Session, EXISTENCE_CHECK};
pub use driver::{Click, Driver, ElementHandle, Item, Modifier, MouseButton, Point, Rect, Scope};
pub use frames::{FrameContext, FrameIndex, FrameInfo, FrameNode, FramePath, FrameSelector, FrameTree};
pub use handlers::{ActionContext, ComponentKind};
pub use locator::{xpath_literal, Locator, Recognition, Segment, TextMatch};
pub use report::{Outcome, RecordingReporter, Report, Reporter, TracingReporter};
pub use search::{ElementLocator, SearchOutcome, Strategy};
pub use settings::Settings;
pub use types::{ElementFacts, ElementType};

/// Result type for eoka-steps operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving an element or running an action on it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No element, or fewer than the requested nth match, after every
    /// strategy and frame was tried.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("Unknown action '{action}' for {kind}.")]
    NotImplemented { action: String, kind: String },

    /// Verified text entry still differed after every retry.
    #[error("{kind} value '{actual}' does not match expected value '{expected}'")]
    ValueMismatch {
        kind: String,
        actual: String,
        expected: String,
    },

    /// A candidate could not be wrapped. Recovered inside the dispatcher.
    #[error("could not wrap element: {0}")]
    WrapFailure(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is the one error kind that may abort a test run.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_message() {
        let err = Error::NotImplemented {
            action: "Spin".into(),
            kind: "ComboBox".into(),
        };
        assert_eq!(err.to_string(), "Unknown action 'Spin' for ComboBox.");
    }

    #[test]
    fn test_value_mismatch_message() {
        let err = Error::ValueMismatch {
            kind: "EditBox".into(),
            actual: "ab".into(),
            expected: "abc".into(),
        };
        assert_eq!(
            err.to_string(),
            "EditBox value 'ab' does not match expected value 'abc'"
        );
    }

    #[test]
    fn test_only_not_found_is_not_found() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(!Error::WrapFailure("x".into()).is_not_found());
        assert!(!Error::Driver("x".into()).is_not_found());
        assert!(!Error::InvalidParameter("x".into()).is_not_found());
    }
}
