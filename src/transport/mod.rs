mod fs;
mod memory;

use futures_util::future::LocalBoxFuture;
use serde::Deserialize;
use url::Url;

pub use fs::FsFetcher;
pub use memory::MemoryFetcher;

/// Cookie policy attached to every document request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    #[default]
    Include,
    SameOrigin,
    Omit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub credentials: Credentials,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request aborted")]
    Aborted,
    #[error("unexpected status {code}")]
    Status { code: u16 },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn status(code: u16) -> Self {
        Self::Status { code }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

pub type FetchFuture = LocalBoxFuture<'static, Result<String, FetchError>>;

/// Document transport. Dropping the returned future must stop the request.
pub trait Fetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture;
}
