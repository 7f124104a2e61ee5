//! Password hashing in the directory's legacy credential format.

use base64::prelude::{Engine, BASE64_STANDARD};
use sha1::{Digest, Sha1};

/// Scheme tag the directory server uses to recognize pre-hashed credentials.
const SCHEME_TAG: &str = "{SHA}";

/// Hashes a password into the `{SHA}<base64-digest>` form stored in the
/// `userPassword` attribute.
///
/// The scheme is unsalted SHA-1 over the UTF-8 password bytes. It is weak by
/// modern standards but must stay byte-for-byte compatible with the
/// credential schemes the deployed directory accepts; changing it is a
/// directory-side migration, not a client decision.
#[must_use]
pub fn sha1_userpassword(password: &str) -> String {
    let digest = Sha1::digest(password.as_bytes());
    format!("{SCHEME_TAG}{}", BASE64_STANDARD.encode(digest))
}
