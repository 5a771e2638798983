//! Dispatcher errors and their HTTP statuses.

use crate::address::AddressError;
use crate::negotiate::NegotiateError;
use crate::update::UpdateError;
use crate::wac::WacError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LdpError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Anonymous caller denied; the reply carries a challenge.
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("no acceptable representation")]
    NotAcceptable,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("precondition failed")]
    PreconditionFailed,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("unsupported media type `{0}`")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    Internal(String),
}

impl LdpError {
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::NotAcceptable => 406,
            Self::Conflict(_) => 409,
            Self::PreconditionFailed => 412,
            Self::PayloadTooLarge => 413,
            Self::UnsupportedMediaType(_) => 415,
            Self::Internal(_) => 500,
        }
    }

    /// Wrap any error as a 500.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<std::io::Error> for LdpError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::internal(err),
        }
    }
}

impl From<AddressError> for LdpError {
    fn from(err: AddressError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<NegotiateError> for LdpError {
    fn from(err: NegotiateError) -> Self {
        match err {
            NegotiateError::NotAcceptable => Self::NotAcceptable,
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<WacError> for LdpError {
    fn from(err: WacError) -> Self {
        Self::internal(err)
    }
}

impl From<UpdateError> for LdpError {
    fn from(err: UpdateError) -> Self {
        Self::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LdpError::Unauthenticated.status(), 401);
        assert_eq!(LdpError::from(NegotiateError::NotAcceptable).status(), 406);
        assert_eq!(
            LdpError::from(NegotiateError::MalformedMediaRange("x".into())).status(),
            400
        );
        assert_eq!(
            LdpError::from(AddressError::MalformedUri("x".into())).status(),
            400
        );
        assert_eq!(
            LdpError::from(UpdateError::Lexical("unterminated".into())).status(),
            500
        );
        assert_eq!(
            LdpError::from(std::io::Error::from(std::io::ErrorKind::NotFound)).status(),
            404
        );
        assert_eq!(
            LdpError::from(std::io::Error::other("disk full")).status(),
            500
        );
    }
}
