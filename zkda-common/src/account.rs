//! Account records and their canonical byte encoding.

use serde::{Deserialize, Serialize};

/// Canonical encoded length of an [`Account`]: two little-endian `u64`s.
pub const ACCOUNT_ENCODED_LEN: usize = 16;

/// Balance-and-nonce record stored under an account key.
///
/// The ledger stores opaque bytes; this codec is the client-side contract
/// for what an account value means. `balance` cannot go negative by type,
/// and `nonce` increments by exactly one per debit the client constructs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: u64,
    pub nonce: u64,
}

impl Account {
    pub fn new(balance: u64, nonce: u64) -> Self {
        Self { balance, nonce }
    }

    /// A freshly created account: the given balance at nonce zero.
    pub fn created(balance: u64) -> Self {
        Self { balance, nonce: 0 }
    }

    /// Encode as exactly 16 bytes: balance then nonce, little-endian.
    pub fn encode(&self) -> [u8; ACCOUNT_ENCODED_LEN] {
        let mut out = [0u8; ACCOUNT_ENCODED_LEN];
        out[..8].copy_from_slice(&self.balance.to_le_bytes());
        out[8..].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Decode from stored bytes.
    ///
    /// Returns `None` for anything shorter than [`ACCOUNT_ENCODED_LEN`],
    /// modeling "key absent or not yet an account". Longer values parse
    /// their first 16 bytes; the remainder is opaque to the client.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < ACCOUNT_ENCODED_LEN {
            return None;
        }
        let mut balance = [0u8; 8];
        let mut nonce = [0u8; 8];
        balance.copy_from_slice(&data[..8]);
        nonce.copy_from_slice(&data[8..16]);
        Some(Self {
            balance: u64::from_le_bytes(balance),
            nonce: u64::from_le_bytes(nonce),
        })
    }
}

/// Ledger key for a named account.
pub fn account_key(name: &str) -> String {
    format!("account:{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_is_little_endian_balance_then_nonce() {
        let bytes = Account::new(1, 2).encode();
        assert_eq!(bytes[..8], [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(bytes[8..], [2, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn decode_rejects_every_short_length() {
        let full = Account::new(u64::MAX, u64::MAX).encode();
        for len in 0..ACCOUNT_ENCODED_LEN {
            assert_eq!(Account::decode(&full[..len]), None, "length {len}");
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut data = Account::new(42, 7).encode().to_vec();
        data.extend_from_slice(b"trailing");
        assert_eq!(Account::decode(&data), Some(Account::new(42, 7)));
    }

    #[test]
    fn created_account_starts_at_nonce_zero() {
        assert_eq!(Account::created(1000), Account::new(1000, 0));
    }

    #[test]
    fn account_key_embeds_name() {
        assert_eq!(account_key("alice"), "account:alice");
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(balance: u64, nonce: u64) {
            let account = Account::new(balance, nonce);
            prop_assert_eq!(Account::decode(&account.encode()), Some(account));
        }
    }
}
