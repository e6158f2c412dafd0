use thiserror::Error;

/// Anything that can go wrong while talking to a market data source.
///
/// The controller does not distinguish between these: every variant ends the
/// cycle as [`Error::FeedUnavailable`].
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error: code {code}, msg: {msg}")]
    Api { code: String, msg: String },

    #[error("empty {0} payload")]
    EmptyData(&'static str),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("price feed unavailable: {0}")]
    FeedUnavailable(#[from] FeedError),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
