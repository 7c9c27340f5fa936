use crate::domain::integrity::KeyedHash;
use crate::error::{GatewayError, Result};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 keyed with the shop's shared secret, hex encoded.
///
/// The key is derived once; every digest starts from a clone of that state.
#[derive(Clone)]
pub struct HmacSha256Hash {
    keyed: HmacSha256,
}

impl HmacSha256Hash {
    pub fn new(secret: SecretString) -> Result<Self> {
        let keyed = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|e| GatewayError::internal(format!("invalid HMAC key: {e}")))?;
        Ok(Self { keyed })
    }
}

impl KeyedHash for HmacSha256Hash {
    fn digest(&self, message: &[u8]) -> String {
        let mac = self.keyed.clone().chain_update(message);
        hex::encode(mac.finalize().into_bytes())
    }
}
