//! Token issuance and validation.

pub mod claims;
pub mod issuer;
pub mod keyring;
pub mod validator;

pub use claims::AccessTokenClaims;
pub use issuer::{IssuedToken, TokenIssuer};
pub use keyring::KeyRing;
pub use validator::TokenValidator;
