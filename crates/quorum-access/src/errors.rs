use quorum_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0:?}")]
pub struct AccessError(pub Box<ErrorObj>);

impl AccessError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }

    pub fn is_retryable(&self) -> bool {
        self.0.is_retryable()
    }

    pub fn not_found(msg: &str) -> Self {
        AccessError(Box::new(
            ErrorBuilder::new(codes::ACCESS_NOT_FOUND)
                .user_msg("No access grant found.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn capacity(msg: &str) -> Self {
        AccessError(Box::new(
            ErrorBuilder::new(codes::ACCESS_CAPACITY)
                .user_msg("The room is full.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn conflict(msg: &str) -> Self {
        AccessError(Box::new(
            ErrorBuilder::new(codes::STORAGE_CONFLICT)
                .user_msg("The room is currently contended. Please retry.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn unavailable(msg: &str) -> Self {
        AccessError(Box::new(
            ErrorBuilder::new(codes::STORAGE_UNAVAILABLE)
                .user_msg("Storage backend unavailable.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn bad_request(msg: &str) -> Self {
        AccessError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg("Invalid access request.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn internal(msg: &str) -> Self {
        AccessError(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Internal access service error.")
                .dev_msg(msg)
                .build(),
        ))
    }
}
