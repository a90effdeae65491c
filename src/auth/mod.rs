/// Authentication module
///
/// Handles JWT encoding/decoding, access/refresh pair issuance, cookie
/// transport, password hashing and the session renewal policy.

mod claims;
mod issuer;
mod jwt;
mod password;
mod session;
mod transport;

pub use claims::{Claims, TokenKind, UserIdentity};
pub use issuer::{CredentialPair, TokenIssuer};
pub use jwt::{Credential, TokenCodec, TokenError};
pub use password::hash_password;
pub use password::verify_password;
pub use session::{Authenticated, LoginOutcome, LoginRequest, SessionManager, SessionState};
pub use transport::{CookieTransport, RawCredentials};
