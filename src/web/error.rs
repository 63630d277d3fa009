use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use strum_macros::AsRefStr;

use crate::web::{routes::WaitlistError, types::DataParsingError};

pub type WebResult<T> = core::result::Result<T, Error>;

#[derive(Debug, AsRefStr, thiserror::Error)]
pub enum Error {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("waitlist error: {0}")]
    Waitlist(#[from] WaitlistError),
}

impl Error {
    pub fn status_code_and_client_error(&self) -> (StatusCode, ClientError) {
        use ClientError::*;

        match self {
            Error::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, MethodNotAllowed),
            Error::Waitlist(WaitlistError::DataParsing(data_er)) => {
                let client_error = match data_er {
                    DataParsingError::MalformedRequest(_) => InvalidJson,
                    DataParsingError::EmailInvalid => InvalidEmail,
                    DataParsingError::AudienceInvalid(_) => InvalidAudience,
                };
                (StatusCode::BAD_REQUEST, client_error)
            }
            Error::Waitlist(WaitlistError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ServiceError)
            }
        }
    }

    /// Server-side errors get logged with their full detail, client errors don't.
    pub fn is_server_error(&self) -> bool {
        self.status_code_and_client_error().0.is_server_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{:<12} - into_response(Error: {self:?})", "INTO_RESP");

        // Construct a response
        let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();

        // Insert the Error into response so that it can be retrieved later.
        res.extensions_mut().insert(Arc::new(self));

        res
    }
}

/// The only error information a client ever receives.
#[derive(Debug, AsRefStr, derive_more::Display)]
pub enum ClientError {
    #[display("Invalid JSON")]
    InvalidJson,
    #[display("Invalid email")]
    InvalidEmail,
    #[display("Invalid audience")]
    InvalidAudience,
    #[display("Method Not Allowed")]
    MethodNotAllowed,
    #[display("Not Found")]
    NotFound,
    #[display("Server error")]
    ServiceError,
}

impl ClientError {
    /// For failed responses that never went through a `web::Error`.
    /// Any other client error comes from a body axum refused to read (e.g. over the size limit).
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => Self::MethodNotAllowed,
            st if st.is_client_error() => Self::InvalidJson,
            _ => Self::ServiceError,
        }
    }
}
