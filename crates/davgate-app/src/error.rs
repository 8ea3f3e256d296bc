//! Errors raised while serving a request.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] davgate_service::error::ServiceError),

    #[error(transparent)]
    CoreError(#[from] davgate_core::error::CoreError),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("XML encoding error: {0}")]
    EncodingError(#[from] quick_xml::encoding::EncodingError),

    /// A request body that parses but is not the document the method expects.
    #[error("Malformed request body: {0}")]
    MalformedBody(&'static str),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
