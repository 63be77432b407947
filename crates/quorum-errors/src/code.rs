use crate::{kind::ErrorKind, retry::RetryClass, severity::Severity};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ErrorCode(Box::leak(s.into_boxed_str())))
    }
}

#[derive(Clone, Debug)]
pub struct CodeSpec {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub http_status: u16,
    pub retryable: RetryClass,
    pub severity: Severity,
    pub default_user_msg: &'static str,
}

pub mod codes {
    use super::ErrorCode;

    pub const AUTH_UNAUTHENTICATED: ErrorCode = ErrorCode("AUTH.UNAUTHENTICATED");
    pub const AUTH_FORBIDDEN: ErrorCode = ErrorCode("AUTH.FORBIDDEN");
    pub const ACCESS_NOT_FOUND: ErrorCode = ErrorCode("ACCESS.NOT_FOUND");
    pub const ACCESS_CAPACITY: ErrorCode = ErrorCode("ACCESS.CAPACITY_EXCEEDED");
    pub const ACCESS_SELF_TARGET: ErrorCode = ErrorCode("ACCESS.SELF_TARGET");
    pub const QUOTA_RATELIMIT: ErrorCode = ErrorCode("QUOTA.RATE_LIMITED");
    pub const SCHEMA_VALIDATION: ErrorCode = ErrorCode("SCHEMA.VALIDATION_FAILED");
    pub const STORAGE_CONFLICT: ErrorCode = ErrorCode("STORAGE.CONFLICT");
    pub const STORAGE_UNAVAILABLE: ErrorCode = ErrorCode("STORAGE.UNAVAILABLE");
    pub const UPSTREAM_UNAVAILABLE: ErrorCode = ErrorCode("UPSTREAM.UNAVAILABLE");
    pub const UPSTREAM_TIMEOUT: ErrorCode = ErrorCode("UPSTREAM.TIMEOUT");
    pub const UNKNOWN_INTERNAL: ErrorCode = ErrorCode("UNKNOWN.INTERNAL");
}

pub static REGISTRY: Lazy<HashMap<&'static str, CodeSpec>> = Lazy::new(|| {
    use codes::*;

    let mut map = HashMap::new();
    let mut add = |spec: CodeSpec| {
        let key = spec.code.0;
        if map.insert(key, spec).is_some() {
            panic!("duplicate error code: {}", key);
        }
    };

    add(CodeSpec {
        code: AUTH_UNAUTHENTICATED,
        kind: ErrorKind::Auth,
        http_status: 401,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "Please sign in.",
    });

    add(CodeSpec {
        code: AUTH_FORBIDDEN,
        kind: ErrorKind::Auth,
        http_status: 403,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "You don't have permission to perform this action.",
    });

    add(CodeSpec {
        code: ACCESS_NOT_FOUND,
        kind: ErrorKind::NotFound,
        http_status: 404,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "No access grant found.",
    });

    add(CodeSpec {
        code: ACCESS_CAPACITY,
        kind: ErrorKind::Capacity,
        http_status: 403,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "The room is full.",
    });

    add(CodeSpec {
        code: ACCESS_SELF_TARGET,
        kind: ErrorKind::Schema,
        http_status: 400,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "You cannot change your own role.",
    });

    add(CodeSpec {
        code: QUOTA_RATELIMIT,
        kind: ErrorKind::RateLimit,
        http_status: 429,
        retryable: RetryClass::Transient,
        severity: Severity::Warn,
        default_user_msg: "Too many requests. Please retry later.",
    });

    add(CodeSpec {
        code: SCHEMA_VALIDATION,
        kind: ErrorKind::Schema,
        http_status: 422,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "Your request is invalid. Please check inputs.",
    });

    add(CodeSpec {
        code: STORAGE_CONFLICT,
        kind: ErrorKind::Conflict,
        http_status: 409,
        retryable: RetryClass::Transient,
        severity: Severity::Warn,
        default_user_msg: "The resource is currently contended. Please retry.",
    });

    add(CodeSpec {
        code: STORAGE_UNAVAILABLE,
        kind: ErrorKind::Storage,
        http_status: 503,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Storage backend is unavailable. Please retry later.",
    });

    add(CodeSpec {
        code: UPSTREAM_UNAVAILABLE,
        kind: ErrorKind::Upstream,
        http_status: 503,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Upstream service is unavailable. Please retry later.",
    });

    add(CodeSpec {
        code: UPSTREAM_TIMEOUT,
        kind: ErrorKind::Timeout,
        http_status: 504,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Upstream service did not respond in time.",
    });

    add(CodeSpec {
        code: UNKNOWN_INTERNAL,
        kind: ErrorKind::Unknown,
        http_status: 500,
        retryable: RetryClass::Transient,
        severity: Severity::Critical,
        default_user_msg: "Internal error. Please retry later.",
    });

    map
});

pub fn spec_of(code: ErrorCode) -> &'static CodeSpec {
    REGISTRY.get(code.0).expect("unregistered ErrorCode")
}
