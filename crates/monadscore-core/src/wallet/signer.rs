use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Private key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Private key must be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Private key is not a valid secp256k1 scalar")]
    InvalidKey,

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Something that owns a wallet and can sign text messages with it.
pub trait MessageSigner: Send + Sync {
    /// EIP-55 checksummed address, `0x` prefixed.
    fn address(&self) -> &str;

    /// Sign `message` and return the `0x` prefixed 65-byte signature.
    fn sign_message(&self, message: &str) -> Result<String, SignerError>;
}

/// Challenge the service expects wallets to sign before mining starts.
pub fn start_message(address: &str) -> String {
    format!(
        "Sign this message to verify ownership and start mining on monad score!\n\n{} ",
        address
    )
}

/// A secp256k1 private key kept in process memory.
pub struct LocalWallet {
    key: SigningKey,
    address: String,
}

impl LocalWallet {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_private_key(private_key: &str) -> Result<Self, SignerError> {
        let trimmed = private_key.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(hex_part)?;
        if bytes.len() != 32 {
            return Err(SignerError::InvalidLength(bytes.len()));
        }

        let key = SigningKey::from_slice(&bytes).map_err(|_| SignerError::InvalidKey)?;
        let address = address_from_verifying_key(key.verifying_key());
        Ok(Self { key, address })
    }
}

impl MessageSigner for LocalWallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign_message(&self, message: &str) -> Result<String, SignerError> {
        let prehash = eip191_hash(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| SignerError::Signing(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(format!("0x{}", hex::encode(out)))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Keccak-256 of the `personal_sign` framing of `message`.
pub(crate) fn eip191_hash(message: &str) -> [u8; 32] {
    let bytes = message.as_bytes();
    let prefix = format!("\x19Ethereum Signed Message:\n{}", bytes.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let encoded = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let digest = Keccak256::digest(&encoded.as_bytes()[1..]);
    to_checksum_address(&digest[12..])
}

/// EIP-55 mixed-case encoding of a 20-byte address.
fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature};

    const KEY_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_address_for_known_key() {
        let wallet = LocalWallet::from_private_key(KEY_ONE).expect("valid key");
        assert_eq!(wallet.address(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

        // Same key without the prefix
        let bare = LocalWallet::from_private_key(&KEY_ONE[2..]).expect("valid key");
        assert_eq!(bare.address(), wallet.address());
    }

    #[test]
    fn test_signature_recovers_to_address() {
        let wallet = LocalWallet::from_private_key(KEY_ONE).expect("valid key");
        let message = start_message(wallet.address());
        let sig_hex = wallet.sign_message(&message).expect("signs");

        assert!(sig_hex.starts_with("0x"));
        let bytes = hex::decode(&sig_hex[2..]).expect("hex signature");
        assert_eq!(bytes.len(), 65);
        assert!(bytes[64] == 27 || bytes[64] == 28);

        let signature = Signature::try_from(&bytes[..64]).expect("signature bytes");
        let recovery_id = RecoveryId::try_from(bytes[64] - 27).expect("recovery id");
        let recovered =
            VerifyingKey::recover_from_prehash(&eip191_hash(&message), &signature, recovery_id)
                .expect("recovers");
        assert_eq!(address_from_verifying_key(&recovered), wallet.address());
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(
            LocalWallet::from_private_key("0xzz"),
            Err(SignerError::InvalidHex(_))
        ));
        assert!(matches!(
            LocalWallet::from_private_key("0x0102"),
            Err(SignerError::InvalidLength(2))
        ));
        let zero = format!("0x{}", "00".repeat(32));
        assert!(matches!(
            LocalWallet::from_private_key(&zero),
            Err(SignerError::InvalidKey)
        ));
    }

    #[test]
    fn test_start_message_format() {
        assert_eq!(
            start_message("0xAbC"),
            "Sign this message to verify ownership and start mining on monad score!\n\n0xAbC "
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = LocalWallet::from_private_key(KEY_ONE).expect("valid key");
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
        assert!(!debug.contains("0000000000000001"));
    }
}
