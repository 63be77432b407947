use crate::filters::PropagationFilter;
use quorum_types::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// One guarded route pattern. Patterns are segment globs in the
/// `/room/:room_id/moderator/:user_id` style; `:name` captures a segment.
pub struct RouteRule {
    pub pattern: String,
    /// Restricts the rule to these methods; empty means any.
    pub methods: Vec<String>,
    /// When set, callers without a grant in the target room are rejected
    /// instead of defaulting to participant.
    pub requires_membership: bool,
    /// Soft participant capacity handed to join propagation.
    pub participant_limit: Option<u32>,
    /// Propagation filters attached to this route, applied in order.
    pub filters: Vec<Arc<dyn PropagationFilter>>,
}

impl RouteRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            methods: Vec::new(),
            requires_membership: false,
            participant_limit: None,
            filters: Vec::new(),
        }
    }

    pub fn methods(mut self, methods: &[&str]) -> Self {
        self.methods = methods.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn require_membership(mut self) -> Self {
        self.requires_membership = true;
        self
    }

    pub fn participant_limit(mut self, limit: u32) -> Self {
        self.participant_limit = Some(limit);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn PropagationFilter>) -> Self {
        self.filters.push(filter);
        self
    }
}

/// A matched rule plus the captured path parameters.
#[derive(Clone)]
pub struct RouteBinding {
    pub rule: Arc<RouteRule>,
    pub params: HashMap<String, String>,
    pub mutating: bool,
}

impl std::fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBinding")
            .field("pattern", &self.rule.pattern)
            .field("params", &self.params)
            .field("mutating", &self.mutating)
            .finish()
    }
}

impl RouteBinding {
    pub fn room_id(&self) -> Option<RoomId> {
        self.params.get("room_id").cloned().map(RoomId)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }
}

/// Ordered route table; the first matching rule wins.
#[derive(Default)]
pub struct RoutePolicy {
    rules: Vec<Arc<RouteRule>>,
}

impl RoutePolicy {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self {
            rules: rules.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn bind(&self, method: &str, path: &str) -> Option<RouteBinding> {
        for rule in &self.rules {
            if !rule.methods.is_empty() && !rule.methods.iter().any(|m| m == method) {
                continue;
            }
            if let Some(params) = match_pattern(&rule.pattern, path) {
                return Some(RouteBinding {
                    rule: rule.clone(),
                    params,
                    mutating: is_mutating(method),
                });
            }
        }
        None
    }
}

fn is_mutating(method: &str) -> bool {
    !matches!(method, "GET" | "HEAD" | "OPTIONS")
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_segments: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    if pattern_segments.len() != path_segments.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (pat, seg) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = pat.strip_prefix(':') {
            if seg.is_empty() {
                return None;
            }
            params.insert(name.to_string(), seg.to_string());
        } else if pat != seg {
            return None;
        }
    }
    Some(params)
}
