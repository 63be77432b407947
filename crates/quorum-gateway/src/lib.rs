pub mod access_api;
pub mod adapter;
pub mod context;
pub mod errors;
pub mod filters;
pub mod prelude;
pub mod routes;
pub mod stages;

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
