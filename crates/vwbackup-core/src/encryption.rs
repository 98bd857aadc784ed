//! Passphrase-based encryption of finished archives.
//!
//! Encrypted archives use the OpenSSL `enc` container, so they open with a
//! stock OpenSSL install:
//!
//! ```text
//! openssl enc -d -aes-256-cbc -pbkdf2 -md sha256 -in backup.tar.gz.enc -out backup.tar.gz
//! ```
//!
//! Layout:
//!
//! ```text
//! magic      8 bytes   "Salted__"
//! salt       8 bytes   random
//! ciphertext rest      AES-256-CBC, PKCS#7 padded
//! ```
//!
//! Key and IV are the first 32 and next 16 bytes of PBKDF2-HMAC-SHA256 over
//! the passphrase and salt with 10,000 rounds (OpenSSL's `-pbkdf2` default).
//!
//! The whole archive is held in memory while it is sealed, so available
//! memory bounds the archive size.

use crate::error::{Error, IoResultExt, Result};
use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Leading bytes of every encrypted archive.
pub const SALTED_MAGIC: &[u8; 8] = b"Salted__";

/// Extension appended to an archive name for its encrypted form.
pub const ENCRYPTED_EXTENSION: &str = "enc";

/// PBKDF2 rounds, matching `openssl enc -pbkdf2`.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

const SALT_SIZE: usize = 8;
const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const HEADER_SIZE: usize = SALTED_MAGIC.len() + SALT_SIZE;

/// Passphrase held in memory that is wiped on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase {
    inner: String,
}

impl Passphrase {
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    /// Get the passphrase (use with caution)
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase([REDACTED {} bytes])", self.inner.len())
    }
}

/// Key followed by IV.
fn derive_key_iv(passphrase: &Passphrase, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE + IV_SIZE]> {
    let mut out = Zeroizing::new([0u8; KEY_SIZE + IV_SIZE]);
    pbkdf2_hmac::<Sha256>(
        passphrase.as_str().as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        out.as_mut(),
    );
    out
}

/// Encrypts an in-memory buffer into the OpenSSL `enc` layout with a fresh
/// random salt.
pub fn encrypt_bytes(passphrase: &Passphrase, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    seal(passphrase, plaintext, &salt)
}

fn seal(passphrase: &Passphrase, plaintext: &[u8], salt: &[u8; SALT_SIZE]) -> Result<Vec<u8>> {
    let key_iv = derive_key_iv(passphrase, salt);
    let (key, iv) = key_iv.split_at(KEY_SIZE);

    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| Error::encryption(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    out.extend_from_slice(SALTED_MAGIC);
    out.extend_from_slice(salt);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Path of the encrypted form of `archive` (`<archive>.enc`).
pub fn encrypted_path_for(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".");
    name.push(ENCRYPTED_EXTENSION);
    PathBuf::from(name)
}

/// Encrypts `archive` into `destination` and deletes the plaintext on
/// success.
///
/// On failure the plaintext archive is left where it was.
pub fn encrypt_archive(
    archive: &Path,
    destination: &Path,
    passphrase: &Passphrase,
) -> Result<PathBuf> {
    if same_file(archive, destination) {
        return Err(Error::encryption(format!(
            "destination {} is the archive being encrypted",
            destination.display()
        )));
    }

    tracing::info!("Encrypting {} with AES-256-CBC", archive.display());

    let plaintext = Zeroizing::new(fs::read(archive).with_path(archive)?);
    let sealed = encrypt_bytes(passphrase, &plaintext)?;
    drop(plaintext);

    fs::write(destination, &sealed).with_path(destination)?;
    tracing::debug!(
        "Wrote {} ({} bytes)",
        destination.display(),
        sealed.len()
    );

    fs::remove_file(archive).map_err(|e| Error::cleanup(archive, e))?;
    tracing::debug!("Removed plaintext archive {}", archive.display());

    Ok(destination.to_path_buf())
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
