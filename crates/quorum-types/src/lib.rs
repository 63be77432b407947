pub mod grant;
pub mod id;
pub mod prelude;
pub mod revision;
pub mod role;
pub mod subject;
