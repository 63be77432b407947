/// Operator-facing weight of an error, carried on every [`crate::ErrorObj`]
/// so log pipelines can route without parsing codes. Throttle exhaustion and
/// degraded token translation sit at `Warn`; a dead-lettered sync delivery
/// is an `Error`; `Critical` is reserved for data-integrity failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
