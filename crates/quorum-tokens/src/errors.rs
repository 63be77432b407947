use quorum_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0:?}")]
pub struct TokenError(pub ErrorObj);

impl TokenError {
    pub fn into_inner(self) -> ErrorObj {
        self.0
    }

    pub fn unauthenticated(msg: &str) -> Self {
        TokenError(
            ErrorBuilder::new(codes::AUTH_UNAUTHENTICATED)
                .user_msg("Please sign in.")
                .dev_msg(msg)
                .build(),
        )
    }

    pub fn internal(msg: &str) -> Self {
        TokenError(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Internal token error.")
                .dev_msg(msg)
                .build(),
        )
    }
}
