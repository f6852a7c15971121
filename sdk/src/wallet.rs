//! Node and client signing keys, and the `.wif` key file format.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::types::Address;

/// An Ed25519 signing key together with the address it controls.
///
/// Validators use it for their node identity; clients use it to sign
/// transactions.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Fresh key from the OS random source.
    ///
    /// ```
    /// let key = sdk::Wallet::generate();
    /// assert_eq!(key.address().to_hex().len(), 40);
    /// ```
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_secret_key(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    /// Parses a hex secret key; surrounding whitespace (a key file's
    /// trailing newline) is ignored.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let decoded = Zeroizing::new(hex::decode(hex.trim())?);
        let secret: Zeroizing<[u8; 32]> = Zeroizing::new(
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| Error::InvalidKey(format!("expected 32 key bytes, found {}", decoded.len())))?,
        );
        Ok(Self::from_secret_key(&secret))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::from_public_key(&signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Reads a `.wif` key file.
    pub fn load_key_file(path: &Path) -> Result<Self> {
        let contents = Zeroizing::new(std::fs::read_to_string(path)?);
        Self::from_hex(&contents)
    }

    /// Write this wallet's secret key to `path` unless the file already
    /// exists.
    ///
    /// Returns `true` when the file was created. An existing file is never
    /// touched, whatever it contains.
    pub fn write_key_file_if_absent(&self, path: &Path) -> Result<bool> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let line = Zeroizing::new(format!("{}\n", self.to_secret_hex().as_str()));
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        Ok(true)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Hex secret key, as stored in key files. Zeroed on drop.
    pub fn to_secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
