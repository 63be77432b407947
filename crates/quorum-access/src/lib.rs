pub mod errors;
pub mod events;
pub mod http;
pub mod prelude;
pub mod reconcile;
pub mod retry;
pub mod service;
pub mod store;

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
