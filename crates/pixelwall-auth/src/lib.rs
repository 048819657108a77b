/// Credential primitives for reserved names: the salted-digest password
/// scheme and the signed identity tokens handed out at reserve/login time.
///
/// The password format is `salt:digest` — 16 random bytes hex-encoded,
/// then sha256 over the salt string concatenated with the password. It is
/// carried over from the service this one replaces so existing stored
/// credentials keep working.
pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenSigner};
