//! Incremental AES-256-GCM.
//!
//! Vault items can be far larger than memory, so instead of the one-shot
//! `Aead` API this module drives the two halves of GCM separately:
//! AES-CTR for the keystream and GHASH for the authentication tag.
//! The output is byte-for-byte standard GCM with a 96-bit IV, no
//! associated data and the 16-byte tag appended after the ciphertext.
//!
//! ```text
//! J0      = IV || 0x00000001
//! C       = P XOR AES-CTR(K, J0 + 1)
//! S       = GHASH_H(C || len64(0) || len64(C))      where H = AES(K, 0^128)
//! tag     = S XOR AES(K, J0)
//! ```

use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use aes::Aes256;
use ghash::universal_hash::UniversalHash;
use ghash::GHash;
use subtle::ConstantTimeEq;

use super::keys::SessionKey;
use crate::errors::{Result, VaultError};

/// Size of the AES-GCM IV in bytes.
pub const IV_LEN: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Largest plaintext GCM can protect under one IV: 2^36 - 32 bytes.
pub const MAX_PAYLOAD_LEN: u64 = (1 << 36) - 32;

const BLOCK_LEN: usize = 16;

type Aes256Ctr = ctr::Ctr32BE<Aes256>;

/// Keystream half of GCM: encrypts or decrypts in place.
pub struct GcmKeystream {
    ctr: Aes256Ctr,
    processed: u64,
}

impl GcmKeystream {
    pub fn new(key: &SessionKey, iv: &[u8; IV_LEN]) -> Self {
        let mut counter = [0u8; BLOCK_LEN];
        counter[..IV_LEN].copy_from_slice(iv);
        counter[BLOCK_LEN - 1] = 2;
        Self {
            ctr: Aes256Ctr::new(key.as_bytes().into(), (&counter).into()),
            processed: 0,
        }
    }

    /// XOR the next `buf.len()` keystream bytes into `buf`.
    pub fn apply(&mut self, buf: &mut [u8]) -> Result<()> {
        self.processed += buf.len() as u64;
        if self.processed > MAX_PAYLOAD_LEN {
            return Err(VaultError::PayloadTooLarge(self.processed));
        }
        self.ctr.apply_keystream(buf);
        Ok(())
    }
}

/// Authentication half of GCM: GHASH over the ciphertext, masked with
/// `AES(K, J0)` on finish.
pub struct GcmAuthenticator {
    ghash: GHash,
    tag_mask: aes::Block,
    pending: [u8; BLOCK_LEN],
    pending_len: usize,
    ciphertext_len: u64,
}

impl GcmAuthenticator {
    pub fn new(key: &SessionKey, iv: &[u8; IV_LEN]) -> Self {
        let aes = Aes256::new(key.as_bytes().into());

        let mut h = aes::Block::default();
        aes.encrypt_block(&mut h);

        let mut j0 = [0u8; BLOCK_LEN];
        j0[..IV_LEN].copy_from_slice(iv);
        j0[BLOCK_LEN - 1] = 1;
        let mut tag_mask = aes::Block::from(j0);
        aes.encrypt_block(&mut tag_mask);

        Self {
            ghash: GHash::new(&h),
            tag_mask,
            pending: [0u8; BLOCK_LEN],
            pending_len: 0,
            ciphertext_len: 0,
        }
    }

    /// Feed ciphertext bytes.  Chunks may have any length; partial
    /// blocks are carried over to the next call.
    pub fn update(&mut self, mut ciphertext: &[u8]) {
        self.ciphertext_len += ciphertext.len() as u64;

        if self.pending_len > 0 {
            let take = (BLOCK_LEN - self.pending_len).min(ciphertext.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&ciphertext[..take]);
            self.pending_len += take;
            ciphertext = &ciphertext[take..];

            if self.pending_len < BLOCK_LEN {
                return;
            }
            self.ghash.update_padded(&self.pending);
            self.pending_len = 0;
        }

        let whole = ciphertext.len() - ciphertext.len() % BLOCK_LEN;
        if whole > 0 {
            self.ghash.update_padded(&ciphertext[..whole]);
        }

        let rest = &ciphertext[whole..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Finish GHASH and return the 16-byte tag.
    pub fn finish(mut self) -> [u8; TAG_LEN] {
        if self.pending_len > 0 {
            self.ghash.update_padded(&self.pending[..self.pending_len]);
        }

        // No associated data, so the AAD length half stays zero.
        let mut lengths = [0u8; BLOCK_LEN];
        lengths[8..].copy_from_slice(&(self.ciphertext_len * 8).to_be_bytes());
        self.ghash.update_padded(&lengths);

        let mut tag = self.ghash.finalize();
        for (t, m) in tag.iter_mut().zip(self.tag_mask.iter()) {
            *t ^= m;
        }
        tag.into()
    }

    /// Finish and compare against `expected` in constant time.
    pub fn verify(self, expected: &[u8; TAG_LEN]) -> Result<()> {
        let computed = self.finish();
        if bool::from(computed[..].ct_eq(&expected[..])) {
            Ok(())
        } else {
            Err(VaultError::AuthenticationFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new([0x42; 32])
    }

    #[test]
    fn keystream_is_an_involution() {
        let iv = [9u8; IV_LEN];
        let mut data = b"attack at dawn, bring snacks".to_vec();

        GcmKeystream::new(&key(), &iv).apply(&mut data).unwrap();
        assert_ne!(&data[..], b"attack at dawn, bring snacks");

        GcmKeystream::new(&key(), &iv).apply(&mut data).unwrap();
        assert_eq!(&data[..], b"attack at dawn, bring snacks");
    }

    #[test]
    fn tag_is_independent_of_chunking() {
        let iv = [3u8; IV_LEN];
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 31) as u8).collect();

        let mut whole = GcmAuthenticator::new(&key(), &iv);
        whole.update(&data);
        let expected = whole.finish();

        for chunk in [1, 5, 15, 16, 17, 333] {
            let mut auth = GcmAuthenticator::new(&key(), &iv);
            for piece in data.chunks(chunk) {
                auth.update(piece);
            }
            assert_eq!(auth.finish(), expected, "chunk size {chunk}");
        }
    }

    #[test]
    fn verify_rejects_wrong_tag() {
        let iv = [1u8; IV_LEN];
        let mut auth = GcmAuthenticator::new(&key(), &iv);
        auth.update(b"ciphertext");
        let mut tag = {
            let mut a = GcmAuthenticator::new(&key(), &iv);
            a.update(b"ciphertext");
            a.finish()
        };
        tag[0] ^= 1;
        assert!(matches!(
            auth.verify(&tag),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn empty_message_tag_matches_nist_vector() {
        // NIST GCM test case 13: zero key, zero IV, empty plaintext.
        let zero_key = SessionKey::new([0u8; 32]);
        let auth = GcmAuthenticator::new(&zero_key, &[0u8; IV_LEN]);
        assert_eq!(
            auth.finish(),
            [
                0x53, 0x0f, 0x8a, 0xfb, 0xc7, 0x45, 0x36, 0xb9, 0xa9, 0x63, 0xb4, 0xf1, 0xc4,
                0xcb, 0x73, 0x8b,
            ]
        );
    }
}
