use base64::{engine::general_purpose::STANDARD, Engine};
use k256::{
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey, SecretKey,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Length of a SEC1-compressed secp256k1 public key
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Key agreement error
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Gateway key is not valid base64
    #[error("Gateway key is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Bytes do not encode a point on secp256k1
    #[error("Invalid secp256k1 public key")]
    InvalidPublicKey,
    /// Bytes do not encode a valid secp256k1 scalar
    #[error("Invalid secp256k1 secret key")]
    InvalidSecretKey,
    /// ECDH produced the point at infinity
    #[error("Key agreement produced the identity point")]
    DegenerateSharedPoint,
}

/// The relay gateway's static public key. Payloads are encrypted to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayKey(PublicKey);

impl GatewayKey {
    /// Parse a base64 SEC1 public key, as published by the gateway
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Parse SEC1 (compressed or uncompressed) public key bytes
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| KeyError::InvalidPublicKey)
    }

    /// The underlying curve point
    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }
}

impl std::str::FromStr for GatewayKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

/// 32-byte symmetric key shared between a submitter and the gateway
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for SharedSecret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Single-use secp256k1 key pair. A fresh one is generated per submission so
/// that every sealed message has its own shared secret.
#[derive(Clone)]
pub struct EphemeralKey {
    secret: SecretKey,
}

impl std::fmt::Debug for EphemeralKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKey")
            .field("public", &hex::encode(self.public_key_bytes()))
            .finish()
    }
}

impl EphemeralKey {
    /// Generate a key pair from the OS RNG
    pub fn random() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Use a known 32-byte secret scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SecretKey::from_slice(bytes)
            .map(|secret| Self { secret })
            .map_err(|_| KeyError::InvalidSecretKey)
    }

    /// The public half
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// SEC1-compressed public key, the form carried in relay messages
    pub fn public_key_bytes(&self) -> [u8; COMPRESSED_KEY_LEN] {
        let mut out = [0u8; COMPRESSED_KEY_LEN];
        out.copy_from_slice(self.public_key().to_encoded_point(true).as_bytes());
        out
    }

    /// Derive the symmetric key shared with the gateway
    pub fn shared_secret(&self, gateway: &GatewayKey) -> Result<SharedSecret, KeyError> {
        self.agree(gateway.public_key())
    }

    /// `SHA-256(SHA-256(compressed(sk · peer)))`. The inner hash is the
    /// libsecp256k1 ECDH output the gateway computes on its side.
    pub fn agree(&self, peer: &PublicKey) -> Result<SharedSecret, KeyError> {
        let shared = (peer.to_projective() * *self.secret.to_nonzero_scalar()).to_affine();
        let encoded = shared.to_encoded_point(true);
        if encoded.as_bytes().len() != COMPRESSED_KEY_LEN {
            return Err(KeyError::DegenerateSharedPoint);
        }

        let ecdh = Sha256::digest(encoded.as_bytes());
        Ok(SharedSecret(Sha256::digest(ecdh).into()))
    }
}
