use auth::JwtSigner;
use auth::JwtVerifier;
use auth::TokenSettings;

pub const ISSUER: &str = "blog";
pub const AUDIENCE: &str = "blog-api";

const PRIVATE_KEY: &[u8] = include_bytes!("../../../auth/fixtures/ec_private.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("../../../auth/fixtures/ec_public.pem");

pub fn signer() -> JwtSigner {
    JwtSigner::new(PRIVATE_KEY, TokenSettings::new(ISSUER, AUDIENCE)).expect("fixture private key")
}

pub fn verifier() -> JwtVerifier {
    JwtVerifier::new(PUBLIC_KEY, ISSUER, AUDIENCE).expect("fixture public key")
}
