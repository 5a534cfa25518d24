//! Identity derivation from a wallet-signed message.
//!
//! The same wallet signing the same fixed message always yields the same
//! (trapdoor, nullifier secret) pair, so a member can re-derive their
//! identity in any later session and prove membership again. Only the
//! commitment is ever published; the secrets stay in process memory for
//! the lifetime of the signaling session.

use ethers::core::utils::hash_message;
use ethers::signers::{LocalWallet, Signer};
use std::fmt;

use crate::error::ProtocolError;
use crate::field::{field_to_hex, hash_to_field, poseidon_hash};
use pasta_curves::pallas;

/// The fixed message members sign to derive their identity.
pub const IDENTITY_MESSAGE: &str = "Sign this message to create your identity!";

/// Minimum signed-message length. A real signature is 65 bytes; anything
/// shorter cannot carry the entropy the derivation relies on.
const MIN_MESSAGE_LEN: usize = 32;

const DOMAIN_TRAPDOOR: &[u8] = b"anon-greeter/trapdoor/v1";
const DOMAIN_NULLIFIER: &[u8] = b"anon-greeter/nullifier/v1";

/// A member's secret identity and its public commitment.
///
/// Not serializable: the trapdoor and nullifier secret must never leave
/// the process. `Debug` prints the commitment only.
pub struct Identity {
    trapdoor: pallas::Base,
    nullifier_secret: pallas::Base,
    commitment: pallas::Base,
}

impl Identity {
    /// Derives an identity from a signed message.
    ///
    /// Deterministic: the same bytes always produce the same identity.
    /// The trapdoor and nullifier secret are independent domain-separated
    /// digests of the signature; the commitment binds both:
    /// `commitment = Poseidon(trapdoor, nullifier_secret)`.
    ///
    /// # Errors
    ///
    /// `ProtocolError::InvalidMessage` if the message is empty or shorter
    /// than signature-grade input.
    pub fn derive(signed_message: &[u8]) -> Result<Self, ProtocolError> {
        if signed_message.len() < MIN_MESSAGE_LEN {
            return Err(ProtocolError::InvalidMessage {
                len: signed_message.len(),
                min: MIN_MESSAGE_LEN,
            });
        }

        let trapdoor = hash_to_field(DOMAIN_TRAPDOOR, signed_message);
        let nullifier_secret = hash_to_field(DOMAIN_NULLIFIER, signed_message);
        let commitment = poseidon_hash(trapdoor, nullifier_secret);

        Ok(Self {
            trapdoor,
            nullifier_secret,
            commitment,
        })
    }

    /// The public identity commitment, usable as a Merkle leaf.
    #[must_use]
    pub fn commitment(&self) -> pallas::Base {
        self.commitment
    }

    pub(crate) fn trapdoor(&self) -> pallas::Base {
        self.trapdoor
    }

    pub(crate) fn nullifier_secret(&self) -> pallas::Base {
        self.nullifier_secret
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("commitment", &field_to_hex(self.commitment))
            .finish_non_exhaustive()
    }
}

/// Opaque signing capability provided by an external wallet/key-holder.
pub trait IdentitySigner {
    fn sign(&self, message: &str) -> Result<Vec<u8>, ProtocolError>;
}

/// Signer backed by a local Ethereum wallet key.
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl WalletSigner {
    #[must_use]
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }

    pub fn from_private_key(private_key: &str) -> Result<Self, ProtocolError> {
        let wallet: LocalWallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| ProtocolError::Signer(format!("failed to parse private key: {e}")))?;
        Ok(Self { wallet })
    }

    #[must_use]
    pub fn random() -> Self {
        Self {
            wallet: LocalWallet::new(&mut rand::thread_rng()),
        }
    }

    /// Ethereum address of the underlying wallet, for display.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{:?}", self.wallet.address())
    }
}

impl IdentitySigner for WalletSigner {
    fn sign(&self, message: &str) -> Result<Vec<u8>, ProtocolError> {
        let signature = self
            .wallet
            .sign_hash(hash_message(message))
            .map_err(|e| ProtocolError::Signer(format!("wallet signing failed: {e}")))?;
        Ok(signature.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_deterministic() {
        let message = [7u8; 65];
        let a = Identity::derive(&message).unwrap();
        let b = Identity::derive(&message).unwrap();
        assert_eq!(a.commitment(), b.commitment());
        assert_eq!(a.trapdoor(), b.trapdoor());
        assert_eq!(a.nullifier_secret(), b.nullifier_secret());
    }

    #[test]
    fn test_derive_distinct_messages() {
        let a = Identity::derive(&[1u8; 65]).unwrap();
        let b = Identity::derive(&[2u8; 65]).unwrap();
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn test_derive_rejects_empty_message() {
        assert!(matches!(
            Identity::derive(&[]),
            Err(ProtocolError::InvalidMessage { len: 0, .. })
        ));
    }

    #[test]
    fn test_derive_rejects_short_message() {
        assert!(Identity::derive(&[1u8; 16]).is_err());
    }

    #[test]
    fn test_commitment_binds_both_secrets() {
        let identity = Identity::derive(&[9u8; 65]).unwrap();
        assert_eq!(
            identity.commitment(),
            poseidon_hash(identity.trapdoor(), identity.nullifier_secret())
        );
    }

    #[test]
    fn test_wallet_signer_deterministic_identity() {
        let signer = WalletSigner::random();
        let sig1 = signer.sign(IDENTITY_MESSAGE).unwrap();
        let sig2 = signer.sign(IDENTITY_MESSAGE).unwrap();

        let a = Identity::derive(&sig1).unwrap();
        let b = Identity::derive(&sig2).unwrap();
        assert_eq!(a.commitment(), b.commitment());
    }

    #[test]
    fn test_distinct_wallets_distinct_identities() {
        let sig1 = WalletSigner::random().sign(IDENTITY_MESSAGE).unwrap();
        let sig2 = WalletSigner::random().sign(IDENTITY_MESSAGE).unwrap();

        let a = Identity::derive(&sig1).unwrap();
        let b = Identity::derive(&sig2).unwrap();
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let identity = Identity::derive(&[3u8; 65]).unwrap();
        let printed = format!("{identity:?}");
        assert!(printed.contains("commitment"));
        assert!(!printed.contains("trapdoor"));
    }
}
