//! Passphrase-based AES sealing of the expiration timestamp.
//!
//! The format is the salted layout produced by `openssl enc -aes-256-cbc -md md5`
//! and by the passphrase mode of the CryptoJS `AES` helper, which is what
//! browser and worker clients use to sign:
//!
//! ```text
//! key || iv = EVP_BytesToKey(MD5, count = 1, passphrase, salt)   (32 + 16 bytes)
//! sealed    = Base64("Salted__" || salt[8] || AES-256-CBC-PKCS7(key, iv, plaintext))
//! ```
//!
//! Signer and verifier must agree on every step here or no signature will
//! ever validate, so none of it is configurable.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use md5::{Digest, Md5};
use rand::RngExt;

use crate::error::AuthError;
use crate::secret::SharedSecret;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Magic prefix marking a salted ciphertext.
const SALTED_MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// Seal an expiration timestamp with a fresh random salt.
#[must_use]
pub fn seal_expiration(expires_at_ms: i64, secret: &SharedSecret) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    seal_with_salt(&expires_at_ms.to_string(), secret, salt)
}

/// Seal `plaintext` with an explicit salt.
///
/// Deterministic for a given salt, which makes it the building block for
/// known-answer tests.
///
/// # Examples
///
/// ```
/// use posgate_auth::SharedSecret;
/// use posgate_auth::seal::{seal_with_salt, unseal};
///
/// let secret = SharedSecret::new("test-shared-secret");
/// let sealed = seal_with_salt("1700000000000", &secret, [1, 2, 3, 4, 5, 6, 7, 8]);
/// assert_eq!(sealed, "U2FsdGVkX18BAgMEBQYHCJ83ZzFuYuXuPU4dBeG6/GU=");
/// assert_eq!(unseal(&sealed, &secret).unwrap(), "1700000000000");
/// ```
#[must_use]
pub fn seal_with_salt(plaintext: &str, secret: &SharedSecret, salt: [u8; SALT_LEN]) -> String {
    let (key, iv) = derive_key_iv(secret.as_bytes(), &salt);
    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut framed = Vec::with_capacity(SALTED_MAGIC.len() + SALT_LEN + ciphertext.len());
    framed.extend_from_slice(SALTED_MAGIC);
    framed.extend_from_slice(&salt);
    framed.extend_from_slice(&ciphertext);
    BASE64.encode(framed)
}

/// Decrypt a sealed value back to its UTF-8 plaintext.
///
/// Every failure (bad Base64, missing salt header, truncated ciphertext, bad
/// padding, non-UTF-8 output) collapses into [`AuthError::DecryptionFailure`].
pub fn unseal(sealed: &str, secret: &SharedSecret) -> Result<String, AuthError> {
    let framed = BASE64
        .decode(sealed)
        .map_err(|_| AuthError::DecryptionFailure)?;

    let rest = framed
        .strip_prefix(SALTED_MAGIC.as_slice())
        .ok_or(AuthError::DecryptionFailure)?;
    if rest.len() < SALT_LEN + BLOCK_LEN {
        return Err(AuthError::DecryptionFailure);
    }
    let (salt, ciphertext) = rest.split_at(SALT_LEN);
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(AuthError::DecryptionFailure);
    }

    let (key, iv) = derive_key_iv(secret.as_bytes(), salt);
    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| AuthError::DecryptionFailure)?;

    String::from_utf8(plaintext).map_err(|_| AuthError::DecryptionFailure)
}

/// Decrypt a sealed expiration and parse it as Unix epoch milliseconds.
///
/// The plaintext must be a non-empty run of ASCII digits that fits in an `i64`.
pub fn open_expiration(sealed: &str, secret: &SharedSecret) -> Result<i64, AuthError> {
    let plaintext = unseal(sealed, secret)?;
    parse_millis(&plaintext).ok_or(AuthError::DecryptionFailure)
}

fn parse_millis(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
///
/// ```text
/// D_1 = MD5(passphrase || salt)
/// D_i = MD5(D_{i-1} || passphrase || salt)
/// key || iv = D_1 || D_2 || D_3  (first 48 bytes)
/// ```
fn derive_key_iv(passphrase: &[u8], salt: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut material = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut previous: Vec<u8> = Vec::new();

    while material.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(passphrase);
        hasher.update(salt);
        previous = hasher.finalize().to_vec();
        material.extend_from_slice(&previous);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&material[..KEY_LEN]);
    iv.copy_from_slice(&material[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}
