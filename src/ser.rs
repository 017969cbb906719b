use ethers_core::types::{Signature, SignatureError};
use serde::{Deserialize, Serialize};

/// Length of an r‖s‖v signature
pub const RSV_LEN: usize = 65;

/// A 65-byte r‖s‖v wallet signature, as `personal_sign` returns it and as
/// the relay contract receives it in `payload_signature`. Serializes as
/// 0x-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvSignature(Signature);

impl RsvSignature {
    /// r‖s‖v bytes, v kept as the wallet produced it
    pub fn to_bytes(&self) -> [u8; RSV_LEN] {
        self.0.into()
    }

    /// Parse r‖s‖v bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        Signature::try_from(bytes).map(Self)
    }
}

impl std::ops::Deref for RsvSignature {
    type Target = Signature;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Signature> for RsvSignature {
    fn from(s: Signature) -> Self {
        Self(s)
    }
}

impl From<RsvSignature> for Signature {
    fn from(s: RsvSignature) -> Self {
        s.0
    }
}

impl Serialize for RsvSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.to_bytes())))
    }
}

impl<'de> Deserialize<'de> for RsvSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Byte fields carried as standard (padded) base64 strings
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(val: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(val))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use ethers_signers::{LocalWallet, Signer};

    use super::*;

    #[test]
    fn base64_fields() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Selector(#[serde(with = "super::base64_bytes")] Vec<u8>);

        let selector = Selector(vec![0x12, 0x34, 0x56, 0x78]);
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(json, "\"EjRWeA==\"");
        assert_eq!(serde_json::from_str::<Selector>(&json).unwrap(), selector);
        assert!(serde_json::from_str::<Selector>("\"%%%\"").is_err());
    }

    #[tokio::test]
    async fn sig_serialization() {
        let signer: LocalWallet = "11".repeat(32).parse().unwrap();
        let signature: RsvSignature = signer.sign_message(Vec::new()).await.unwrap().into();

        let hex_sig = format!("0x{}", *signature);
        assert_eq!(signature.to_bytes().len(), RSV_LEN);
        assert_eq!(
            serde_json::to_value(signature).unwrap(),
            serde_json::Value::String(hex_sig.clone()),
        );
        let parsed: RsvSignature = serde_json::from_value(hex_sig.into()).unwrap();
        assert_eq!(parsed, signature);
    }
}
