//! Deterministic upload tokens derived from file names.
//!
//! A token is a keyed one-way digest of the name, rendered as lowercase hex.
//! The HMAC variants are cheap; [`TokenAlgorithm::Argon2id`] is a work-factor
//! hash for deployments where file names are guessable. With the salt pinned
//! for the process, re-uploading the same file name yields the same token,
//! while the name cannot be recovered from the token.

use argon2::password_hash::Output;
use argon2::{Algorithm, Argon2, Params, Version};
#[cfg(feature = "config")]
use clap::ValueEnum;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};

use crate::service::{Result, ServiceError};

/// Tracing target for token minting.
const TRACING_TARGET: &str = "uptrack_server::service::token_minter";

/// Bytes of randomness in a generated salt.
pub const DEFAULT_SALT_BYTES: usize = 10;

/// Argon2 needs at least this many salt bytes.
const ARGON2_MIN_SALT_LEN: usize = 8;

/// Digest bytes produced by [`TokenAlgorithm::Argon2id`].
const ARGON2_OUTPUT_LEN: usize = 32;

/// Function used to derive tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenAlgorithm {
    /// HMAC-SHA-256.
    Sha256,
    /// HMAC-SHA-512.
    #[default]
    Sha512,
    /// Argon2id with 19 MiB of memory and two passes.
    Argon2id,
}

#[derive(Clone)]
enum Keyed {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
    Argon2id { hasher: Argon2<'static>, salt: Vec<u8> },
}

/// Mints and checks tokens with one salt.
///
/// The key is prepared once at construction; each mint clones the keyed state.
#[derive(Clone)]
pub struct TokenMinter {
    keyed: Keyed,
    algorithm: TokenAlgorithm,
}

impl TokenMinter {
    /// Creates a minter pinned to `salt`.
    pub fn new(salt: impl Into<String>, algorithm: TokenAlgorithm) -> Result<Self> {
        let salt = salt.into();
        if salt.is_empty() {
            return Err(ServiceError::config("Token salt cannot be empty"));
        }

        let key = salt.as_bytes();

        let keyed = match algorithm {
            TokenAlgorithm::Sha256 => {
                Keyed::Sha256(Hmac::<Sha256>::new_from_slice(key).map_err(ServiceError::minting)?)
            }
            TokenAlgorithm::Sha512 => {
                Keyed::Sha512(Hmac::<Sha512>::new_from_slice(key).map_err(ServiceError::minting)?)
            }
            TokenAlgorithm::Argon2id => {
                if key.len() < ARGON2_MIN_SALT_LEN {
                    return Err(ServiceError::config(format!(
                        "Token salt must be at least {ARGON2_MIN_SALT_LEN} bytes for argon2id"
                    )));
                }

                let params = Params::new(19456, 2, 1, Some(ARGON2_OUTPUT_LEN)).map_err(|e| {
                    ServiceError::config(format!("Invalid argon2 parameters: {e}"))
                })?;
                Keyed::Argon2id {
                    hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
                    salt: key.to_vec(),
                }
            }
        };

        Ok(Self { keyed, algorithm })
    }

    /// Creates a minter with a freshly generated salt.
    pub fn generate(algorithm: TokenAlgorithm) -> Result<Self> {
        let minter = Self::new(shake_salt(DEFAULT_SALT_BYTES), algorithm)?;

        tracing::warn!(
            target: TRACING_TARGET,
            algorithm = %algorithm,
            "No token salt configured, generated one for this process"
        );

        Ok(minter)
    }

    /// Creates a minter from an optional configured salt.
    pub fn from_salt(salt: Option<&str>, algorithm: TokenAlgorithm) -> Result<Self> {
        match salt {
            Some(salt) => Self::new(salt, algorithm),
            None => Self::generate(algorithm),
        }
    }

    fn digest(&self, name: &str) -> Result<Vec<u8>> {
        match &self.keyed {
            Keyed::Sha256(mac) => {
                let mut mac = mac.clone();
                mac.update(name.as_bytes());
                Ok(mac.finalize().into_bytes().to_vec())
            }
            Keyed::Sha512(mac) => {
                let mut mac = mac.clone();
                mac.update(name.as_bytes());
                Ok(mac.finalize().into_bytes().to_vec())
            }
            Keyed::Argon2id { hasher, salt } => {
                let mut out = vec![0_u8; ARGON2_OUTPUT_LEN];
                hasher
                    .hash_password_into(name.as_bytes(), salt, &mut out)
                    .map_err(ServiceError::minting)?;
                Ok(out)
            }
        }
    }

    /// Returns the hex token for `name`.
    pub fn mint(&self, name: &str) -> Result<String> {
        self.digest(name).map(hex::encode)
    }

    /// Checks `digest` against the token for `name` in constant time.
    pub fn verify(&self, name: &str, digest: &str) -> bool {
        let Ok(given) = hex::decode(digest) else {
            return false;
        };
        let Ok(expected) = self.digest(name) else {
            return false;
        };

        match (Output::new(&expected), Output::new(&given)) {
            (Ok(expected), Ok(given)) => expected == given,
            _ => false,
        }
    }
}

impl std::fmt::Debug for TokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMinter")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Returns `size` random bytes as lowercase hex.
pub fn shake_salt(size: usize) -> String {
    let mut bytes = vec![0_u8; size];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns the hex token for `name` keyed with `salt`.
pub fn obscure(name: &str, algorithm: TokenAlgorithm, salt: &str) -> Result<String> {
    TokenMinter::new(salt, algorithm)?.mint(name)
}

/// Checks whether `digest` is the token for `name` keyed with `salt`.
pub fn validate(name: &str, salt: &str, digest: &str, algorithm: TokenAlgorithm) -> bool {
    TokenMinter::new(salt, algorithm).is_ok_and(|minter| minter.verify(name, digest))
}
