pub mod claims;
pub mod errors;
pub mod signer;
pub mod verifier;

pub use claims::Claims;
pub use claims::TokenKind;
pub use claims::PERMISSIONS_CLAIM;
pub use errors::JwtError;
pub use signer::IssuedToken;
pub use signer::JwtSigner;
pub use signer::TokenSettings;
pub use signer::TokenSigner;
pub use verifier::JwtVerifier;
pub use verifier::TokenVerifier;
