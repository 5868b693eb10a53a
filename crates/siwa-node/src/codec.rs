//! Textual encodings of keys: hex over the bincode bytes.
use crate::{KeyCurve, NodeError, PrivateKey, PublicKey};
use siwa_bls::group::Curve;

pub fn encode_private_key(key: &PrivateKey) -> Result<String, NodeError> {
    bincode::serialize(key)
        .map(hex::encode)
        .map_err(|e| NodeError::Configuration(e.to_string()))
}

pub fn decode_private_key(encoded: &str) -> Result<PrivateKey, NodeError> {
    let bytes = hex::decode(encoded.trim())
        .map_err(|e| NodeError::Configuration(format!("private key is not hex: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| NodeError::Configuration(format!("private key is not a scalar: {}", e)))
}

pub fn encode_public_key(key: &PublicKey) -> Result<String, NodeError> {
    bincode::serialize(key)
        .map(hex::encode)
        .map_err(|e| NodeError::Configuration(e.to_string()))
}

pub fn decode_public_key(encoded: &str) -> Result<PublicKey, NodeError> {
    let bytes = hex::decode(encoded.trim())
        .map_err(|e| NodeError::Configuration(format!("public key is not hex: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| NodeError::Configuration(format!("public key is not a point: {}", e)))
}

/// Derives the public key of an encoded private key.
pub fn public_key_of(encoded_private: &str) -> Result<PublicKey, NodeError> {
    decode_private_key(encoded_private).map(|k| KeyCurve::public_of(&k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn public_key_roundtrip() {
        let (_, public) = KeyCurve::keypair(&mut thread_rng());
        let encoded = encode_public_key(&public).unwrap();
        assert_eq!(decode_public_key(&encoded).unwrap(), public);
    }

    #[test]
    fn private_key_derives_same_public() {
        let (private, public) = KeyCurve::keypair(&mut thread_rng());
        let encoded = encode_private_key(&private).unwrap();
        assert_eq!(decode_private_key(&encoded).unwrap(), private);
        assert_eq!(public_key_of(&encoded).unwrap(), public);
    }

    #[test]
    fn malformed_keys_are_configuration_errors() {
        for bad in &["zz", "", "0102"] {
            match decode_private_key(bad).unwrap_err() {
                NodeError::Configuration(_) => {}
                e => panic!("unexpected error {}", e),
            }
        }
        decode_public_key("abcd").unwrap_err();
    }
}
