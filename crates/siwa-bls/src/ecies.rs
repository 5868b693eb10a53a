//! Elliptic Curve Integrated Encryption Scheme: ephemeral-static
//! Diffie-Hellman on the curve, HKDF-SHA256 as key derivation and
//! ChaCha20-Poly1305 as the AEAD. Deals are encrypted to their recipient with
//! it.
use crate::group::{Curve, Element};
use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, NewAead},
    ChaCha20Poly1305,
};
use hkdf::Hkdf;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

const NONCE_LEN: usize = 12;

const KEY_LEN: usize = 32;

/// Domain separator fed to the key derivation
const DOMAIN: &[u8] = b"siwa-ecies-v1";

#[derive(Debug, Error)]
pub enum EciesError {
    #[error("could not encode the shared point: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("aead encryption failed")]
    Encryption,
    #[error("aead decryption failed")]
    Decryption,
}

/// A ciphertext together with the ephemeral point needed to rebuild the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "C::Point: Serialize + serde::de::DeserializeOwned")]
pub struct EciesCipher<C: Curve> {
    aead: Vec<u8>,
    ephemeral: C::Point,
    nonce: [u8; NONCE_LEN],
}

#[cfg(any(test, feature = "test-helpers"))]
impl<C: Curve> EciesCipher<C> {
    /// Flips a bit of the ciphertext so that it no longer authenticates.
    pub fn corrupt(&mut self) {
        if let Some(b) = self.aead.first_mut() {
            *b ^= 0x01;
        }
    }
}

/// Encrypts `msg` to the holder of the private key behind `to`.
pub fn encrypt<C: Curve, R: RngCore>(
    to: &C::Point,
    msg: &[u8],
    rng: &mut R,
) -> Result<EciesCipher<C>, EciesError> {
    let (eph_secret, ephemeral) = C::keypair(rng);

    // dh = eph * (x G)
    let mut dh = to.clone();
    dh.mul(&eph_secret);
    let key = derive::<C>(&dh)?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let aead = ChaCha20Poly1305::new(GenericArray::from_slice(&key))
        .encrypt(GenericArray::from_slice(&nonce), msg)
        .map_err(|_| EciesError::Encryption)?;

    Ok(EciesCipher {
        aead,
        ephemeral,
        nonce,
    })
}

/// Decrypts with the recipient's private scalar.
pub fn decrypt<C: Curve>(private: &C::Scalar, cipher: &EciesCipher<C>) -> Result<Vec<u8>, EciesError> {
    // dh = x * (eph G)
    let mut dh = cipher.ephemeral.clone();
    dh.mul(private);
    let key = derive::<C>(&dh)?;

    ChaCha20Poly1305::new(GenericArray::from_slice(&key))
        .decrypt(GenericArray::from_slice(&cipher.nonce), &cipher.aead[..])
        .map_err(|_| EciesError::Decryption)
}

fn derive<C: Curve>(dh: &C::Point) -> Result<[u8; KEY_LEN], EciesError> {
    let ikm = bincode::serialize(dh)?;

    // no salt needed, the DH input is ephemeral
    let mut key = [0u8; KEY_LEN];
    Hkdf::<Sha256>::new(None, &ikm)
        .expand(DOMAIN, &mut key)
        .map_err(|_| EciesError::KeyDerivation)?;
    Ok(key)
}
