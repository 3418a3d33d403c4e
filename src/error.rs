use crate::transition::HookError;
use crate::transport::FetchError;

pub type NavResult<T> = Result<T, NavError>;

/// Which document a structural lookup ran against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Live,
    Incoming { address: String },
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => Ok(()),
            Self::Incoming { address } => write!(f, " from incoming document {address}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Enter,
    Leave,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enter => f.write_str("enter"),
            Self::Leave => f.write_str("leave"),
        }
    }
}

/// Coarse grouping of failures, used by listeners of the `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    StructuralPrecondition,
    TransitionResolution,
    TransportFailure,
    HookFailure,
    Setup,
}

#[derive(thiserror::Error, Debug)]
pub enum NavError {
    #[error("{selector} element missing{source_doc}")]
    MissingContainer {
        selector: String,
        source_doc: DocumentSource,
    },
    #[error("unknown transition: {0}")]
    UnknownTransition(String),
    #[error("{phase} missing from transition: {transition}")]
    MissingHook {
        transition: String,
        phase: HookPhase,
    },
    #[error("failed to fetch {address}")]
    Transport {
        address: String,
        #[source]
        source: FetchError,
    },
    #[error("{phase} hook of transition {transition} failed")]
    Hook {
        transition: String,
        phase: HookPhase,
        #[source]
        source: HookError,
    },
    #[error("invalid address: {address}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<std::io::Error> for NavError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl NavError {
    pub fn missing_container(selector: impl Into<String>, source_doc: DocumentSource) -> Self {
        Self::MissingContainer {
            selector: selector.into(),
            source_doc,
        }
    }

    pub fn unknown_transition(name: impl Into<String>) -> Self {
        Self::UnknownTransition(name.into())
    }

    pub fn missing_hook(transition: impl Into<String>, phase: HookPhase) -> Self {
        Self::MissingHook {
            transition: transition.into(),
            phase,
        }
    }

    pub fn transport(address: impl Into<String>, source: FetchError) -> Self {
        Self::Transport {
            address: address.into(),
            source,
        }
    }

    pub fn hook(transition: impl Into<String>, phase: HookPhase, source: HookError) -> Self {
        Self::Hook {
            transition: transition.into(),
            phase,
            source,
        }
    }

    pub fn invalid_address(address: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            source,
        }
    }

    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingContainer { .. } => ErrorCategory::StructuralPrecondition,
            Self::UnknownTransition(_) | Self::MissingHook { .. } => {
                ErrorCategory::TransitionResolution
            }
            Self::Transport { .. } => ErrorCategory::TransportFailure,
            Self::Hook { .. } => ErrorCategory::HookFailure,
            Self::InvalidAddress { .. } | Self::Io { .. } | Self::InvalidArgument(_) => {
                ErrorCategory::Setup
            }
        }
    }
}
