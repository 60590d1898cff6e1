use std::error::Error as StdError;
use std::fmt;

mod document;
mod dom;
mod intercept;
mod listeners;
mod markup;
mod notification;
mod probe;
mod recorder;

pub use document::Document;
pub use dom::NodeId;
pub use intercept::NodeOrText;
pub use listeners::ListenerId;
pub use notification::{AttrChange, MutationKind, MutationNotification};
pub use probe::{HostMode, InstallOutcome};
pub use recorder::{ExpectedNotification, NotificationLog};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    InvalidOperation(String),
    NotFound(String),
    AssertionFailed {
        index: usize,
        expected: String,
        actual: String,
        log_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::AssertionFailed {
                index,
                expected,
                actual,
                log_snippet,
            } => write!(
                f,
                "assertion failed at event {index}: expected {expected}, actual {actual}, log {log_snippet}"
            ),
        }
    }
}

impl StdError for Error {}
