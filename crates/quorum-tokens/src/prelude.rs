pub use crate::authority::{InternalTokenAuthority, PublicTokenAuthority};
pub use crate::claims::{InternalClaims, PublicClaims};
pub use crate::errors::TokenError;
pub use crate::keys::Keyring;
