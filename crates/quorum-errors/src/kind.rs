#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Auth,
    Schema,
    NotFound,
    Conflict,
    Capacity,
    RateLimit,
    Storage,
    Upstream,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Auth => "Auth",
            ErrorKind::Schema => "Schema",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Capacity => "Capacity",
            ErrorKind::RateLimit => "RateLimit",
            ErrorKind::Storage => "Storage",
            ErrorKind::Upstream => "Upstream",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Unknown => "Unknown",
        }
    }
}
