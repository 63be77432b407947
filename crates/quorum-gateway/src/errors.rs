use quorum_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0:?}")]
pub struct GatewayError(pub Box<ErrorObj>);

impl GatewayError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }

    pub fn unauthenticated(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::AUTH_UNAUTHENTICATED)
                .user_msg("Please sign in.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn forbidden(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::AUTH_FORBIDDEN)
                .user_msg("You don't have access to this room.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn self_target(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::ACCESS_SELF_TARGET)
                .user_msg("You cannot change your own role.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn rate_limited(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::QUOTA_RATELIMIT)
                .user_msg("Too many requests. Please retry later.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn bad_request(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg("Your request is invalid.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn upstream_unavailable(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::UPSTREAM_UNAVAILABLE)
                .user_msg("A backing service is unavailable. Please retry later.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn upstream_timeout(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::UPSTREAM_TIMEOUT)
                .user_msg("A backing service did not respond in time.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn internal(msg: &str) -> Self {
        GatewayError(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Internal gateway error.")
                .dev_msg(msg)
                .build(),
        ))
    }
}

impl From<quorum_tokens::errors::TokenError> for GatewayError {
    fn from(err: quorum_tokens::errors::TokenError) -> Self {
        GatewayError(Box::new(err.0))
    }
}
