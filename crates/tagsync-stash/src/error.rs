use thiserror::Error;

#[derive(Error, Debug)]
pub enum StashError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("GraphQL response has no data for `{0}`")]
    MissingData(&'static str),

    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),
}

pub type Result<T> = std::result::Result<T, StashError>;
