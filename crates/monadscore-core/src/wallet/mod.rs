//! Wallet module for deriving addresses and signing messages.
//!
//! This module provides:
//! - `MessageSigner`: the signing capability an agent needs
//! - `LocalWallet`: a secp256k1 key held in memory, producing EIP-191
//!   personal-sign signatures

pub mod signer;

pub use signer::{start_message, LocalWallet, MessageSigner, SignerError};
