pub mod authority;
pub mod base64url;
pub mod claims;
pub mod errors;
pub mod jws;
pub mod keys;
pub mod prelude;
