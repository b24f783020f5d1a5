pub mod claims;
pub mod errors;
pub mod handler;
pub mod keys;

pub use claims::ClaimSet;
pub use claims::TokenPair;
pub use claims::TokenType;
pub use errors::JwtError;
pub use handler::TokenCodec;
pub use keys::KeyRing;
pub use keys::SigningKey;
