//! Typed domain errors and their JSON-RPC wire mapping.

use crate::controller::ControllerError;
use rpc_protocol::{error_codes, ErrorBody};

/// Error returned by a registered RPC handler.
///
/// Middleware never constructs these directly except for `Internal` (used to
/// wrap anything a handler propagates via `?`); handlers construct the
/// specific variant that matches the failure they hit.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("{0}")]
    InvalidParams(String),
    #[error("{0}")]
    CameraNotFound(String),
    #[error("{0}")]
    AuthenticationRequired(String),
    #[error("unknown method '{0}'")]
    MethodNotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            RpcError::CameraNotFound(_) => error_codes::CAMERA_NOT_FOUND,
            RpcError::AuthenticationRequired(_) => error_codes::AUTHENTICATION_REQUIRED,
            RpcError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            RpcError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            RpcError::InvalidParams(_) => Some("Check the method's documented parameters"),
            RpcError::CameraNotFound(_) => Some("Verify the device identifier"),
            RpcError::AuthenticationRequired(_) => Some("Authenticate first"),
            RpcError::MethodNotFound(_) => Some("Verify method name"),
            RpcError::Internal(_) => None,
        }
    }

    pub fn into_body(self) -> ErrorBody {
        let code = self.code();
        let suggestion = self.suggestion().map(ToOwned::to_owned);
        ErrorBody {
            code,
            message: self.to_string(),
            data: None,
            suggestion,
        }
    }
}

impl From<ControllerError> for RpcError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::CameraNotFound(msg) => RpcError::CameraNotFound(msg),
            ControllerError::SessionNotFound(msg) => {
                RpcError::CameraNotFound(format!("no active recording session for '{msg}'"))
            }
            ControllerError::FileNotFound(msg) => {
                RpcError::InvalidParams(format!("file '{msg}' not found"))
            }
            ControllerError::Internal(msg) => RpcError::Internal(msg),
        }
    }
}

/// Build the fixed-code error bodies the middleware gates emit directly
/// (rate limit, permission, auth, method-not-found) with their standard
/// suggestion text.
pub fn rate_limit_exceeded() -> ErrorBody {
    ErrorBody {
        code: error_codes::RATE_LIMIT_EXCEEDED,
        message: "rate limit exceeded".to_owned(),
        data: None,
        suggestion: Some("Reduce request rate".to_owned()),
    }
}

pub fn insufficient_permissions(required: &str) -> ErrorBody {
    ErrorBody {
        code: error_codes::INSUFFICIENT_PERMISSIONS,
        message: format!("method requires role '{required}' or higher"),
        data: None,
        suggestion: Some("Request access from an administrator".to_owned()),
    }
}

pub fn authentication_required() -> ErrorBody {
    ErrorBody {
        code: error_codes::AUTHENTICATION_REQUIRED,
        message: "this method requires authentication".to_owned(),
        data: None,
        suggestion: Some("Authenticate first".to_owned()),
    }
}

pub fn method_not_found(method: &str) -> ErrorBody {
    ErrorBody {
        code: error_codes::METHOD_NOT_FOUND,
        message: format!("unknown method '{method}'"),
        data: None,
        suggestion: Some("Verify method name".to_owned()),
    }
}

pub fn invalid_request(message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        code: error_codes::INVALID_REQUEST,
        message: message.into(),
        data: None,
        suggestion: Some("Verify the request envelope".to_owned()),
    }
}
