//! HMAC-SHA256 quote signing and verification.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{DomainError, Timestamp};

use super::{Quote, SignedQuote};

type HmacSha256 = Hmac<Sha256>;

/// Signs quotes with a server-side key.
pub struct QuoteSigner {
    key: Secret<String>,
}

impl QuoteSigner {
    /// Creates a signer for the given server-side key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Secret::new(key.into()),
        }
    }

    /// Signs a quote over its canonical JSON form.
    ///
    /// serde_json maps serialize with sorted keys, so routing the struct
    /// through a `Value` yields a canonical byte string.
    pub fn sign(&self, quote: Quote) -> Result<SignedQuote, DomainError> {
        let canonical = Self::canonical_json(&quote)?;
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| DomainError::internal(format!("hmac init: {}", e)))?;
        mac.update(canonical.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(SignedQuote { quote, signature })
    }

    /// Verifies a signed quote's signature in constant time.
    pub fn verify(&self, signed: &SignedQuote) -> Result<bool, DomainError> {
        let canonical = Self::canonical_json(&signed.quote)?;
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| DomainError::internal(format!("hmac init: {}", e)))?;
        mac.update(canonical.as_bytes());
        let expected = mac.finalize().into_bytes();

        let presented = match hex::decode(&signed.signature) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        if presented.len() != expected.len() {
            return Ok(false);
        }
        Ok(expected.as_slice().ct_eq(&presented).into())
    }

    /// A signed quote is redeemable only while unexpired and untampered.
    pub fn is_redeemable(&self, signed: &SignedQuote, now: Timestamp) -> Result<bool, DomainError> {
        Ok(!signed.quote.is_expired(now) && self.verify(signed)?)
    }

    fn canonical_json(quote: &Quote) -> Result<String, DomainError> {
        let value = serde_json::to_value(quote)
            .map_err(|e| DomainError::internal(format!("quote serialize: {}", e)))?;
        serde_json::to_string(&value)
            .map_err(|e| DomainError::internal(format!("quote serialize: {}", e)))
    }
}
