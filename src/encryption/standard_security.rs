//! Standard Security Handler key derivation (ISO 32000-1 Section 7.6.3).
//!
//! Algorithms 2, 3 and 5, parameterized by handler revision and key
//! length. Revision 3 with a 128-bit key is the write-side profile;
//! revision 2 (40-bit) documents are accepted on read.

use crate::encryption::rc4_apply;
use crate::error::{PdfError, Result};
use crate::objects::ObjectId;

/// The 32-byte password padding string from the PDF specification.
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Password-based handler parameterized by revision and key length.
#[derive(Debug, Clone, Copy)]
pub struct StandardSecurityHandler {
    revision: u8,
    key_length: usize,
}

impl StandardSecurityHandler {
    /// Revision 3, 128-bit keys: the profile this crate writes.
    pub fn rc4_128bit() -> Self {
        Self {
            revision: 3,
            key_length: 16,
        }
    }

    /// Revision 2, 40-bit keys: accepted on read.
    pub fn rc4_40bit() -> Self {
        Self {
            revision: 2,
            key_length: 5,
        }
    }

    pub fn new(revision: u8, key_length: usize) -> Result<Self> {
        if !(2..=3).contains(&revision) {
            return Err(PdfError::UnsupportedEncryption(format!(
                "security handler revision {revision}"
            )));
        }
        if !(5..=16).contains(&key_length) {
            return Err(PdfError::UnsupportedEncryption(format!(
                "key length {} bits",
                key_length * 8
            )));
        }
        Ok(Self {
            revision,
            key_length,
        })
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Truncate to 32 bytes and right-pad with the standard padding string.
    pub fn pad_password(password: &[u8]) -> [u8; 32] {
        let mut padded = [0u8; 32];
        let len = password.len().min(32);
        padded[..len].copy_from_slice(&password[..len]);
        padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
        padded
    }

    /// Algorithm 3: the /O entry. An empty owner password falls back to the
    /// user password.
    pub fn compute_owner_hash(&self, owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
        let effective_owner = if owner_password.is_empty() {
            user_password
        } else {
            owner_password
        };
        let padded_owner = Self::pad_password(effective_owner);

        let mut hash = md5::compute(padded_owner).0.to_vec();
        if self.revision >= 3 {
            for _ in 0..50 {
                hash = md5::compute(&hash).0.to_vec();
            }
        }
        let key = &hash[..self.key_length];

        let mut out = Self::pad_password(user_password).to_vec();
        rc4_apply(key, &mut out);
        if self.revision >= 3 {
            for i in 1u8..=19 {
                let iter_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
                rc4_apply(&iter_key, &mut out);
            }
        }
        out
    }

    /// Algorithm 2: the file encryption key, from the padded user password,
    /// /O, /P (as little-endian signed 32-bit) and the first file
    /// identifier.
    pub fn compute_file_key(
        &self,
        user_password: &[u8],
        owner_hash: &[u8],
        p: i32,
        id0: &[u8],
    ) -> Vec<u8> {
        let mut ctx = md5::Context::new();
        ctx.consume(Self::pad_password(user_password));
        ctx.consume(owner_hash);
        ctx.consume(p.to_le_bytes());
        ctx.consume(id0);
        let mut hash = ctx.compute().0.to_vec();

        if self.revision >= 3 {
            for _ in 0..50 {
                hash = md5::compute(&hash[..self.key_length]).0.to_vec();
            }
        }
        hash.truncate(self.key_length);
        hash
    }

    /// Algorithms 4 and 5: the /U entry for the given file key.
    pub fn compute_user_hash(&self, file_key: &[u8], id0: &[u8]) -> Vec<u8> {
        if self.revision == 2 {
            let mut out = PASSWORD_PADDING.to_vec();
            rc4_apply(file_key, &mut out);
            return out;
        }

        let mut ctx = md5::Context::new();
        ctx.consume(PASSWORD_PADDING);
        ctx.consume(id0);
        let mut out = ctx.compute().0.to_vec();

        rc4_apply(file_key, &mut out);
        for i in 1u8..=19 {
            let iter_key: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
            rc4_apply(&iter_key, &mut out);
        }
        // 16 significant bytes; the remainder is arbitrary
        out.resize(32, 0);
        out
    }

    /// Per-object key: MD5 over the file key followed by the low three
    /// bytes of the object number and low two of the generation.
    pub fn object_key(&self, file_key: &[u8], id: ObjectId) -> Vec<u8> {
        let mut data = file_key.to_vec();
        data.extend_from_slice(&id.number().to_le_bytes()[..3]);
        data.extend_from_slice(&id.generation().to_le_bytes()[..2]);
        let hash = md5::compute(&data);
        let len = (file_key.len() + 5).min(16);
        hash.0[..len].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_password() {
        let padded = StandardSecurityHandler::pad_password(b"test");
        assert_eq!(padded.len(), 32);
        assert_eq!(&padded[..4], b"test");
        assert_eq!(&padded[4..], &PASSWORD_PADDING[..28]);

        let empty = StandardSecurityHandler::pad_password(b"");
        assert_eq!(empty, PASSWORD_PADDING);

        let long = StandardSecurityHandler::pad_password(&[b'x'; 40]);
        assert_eq!(long, [b'x'; 32]);
    }

    #[test]
    fn test_handler_parameters() {
        assert_eq!(StandardSecurityHandler::rc4_128bit().revision(), 3);
        assert_eq!(StandardSecurityHandler::rc4_128bit().key_length(), 16);
        assert_eq!(StandardSecurityHandler::rc4_40bit().key_length(), 5);
        assert!(StandardSecurityHandler::new(4, 16).is_err());
        assert!(StandardSecurityHandler::new(3, 32).is_err());
    }

    #[test]
    fn test_owner_hash_shape() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let o = handler.compute_owner_hash(b"owner", b"user");
        assert_eq!(o.len(), 32);
    }

    #[test]
    fn test_empty_owner_falls_back_to_user() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let from_user = handler.compute_owner_hash(b"", b"secret");
        let explicit = handler.compute_owner_hash(b"secret", b"secret");
        assert_eq!(from_user, explicit);
    }

    #[test]
    fn test_key_lengths() {
        let id0 = [0u8; 16];
        let o = vec![0u8; 32];
        let r3 = StandardSecurityHandler::rc4_128bit().compute_file_key(b"", &o, -1, &id0);
        assert_eq!(r3.len(), 16);
        let r2 = StandardSecurityHandler::rc4_40bit().compute_file_key(b"", &o, -1, &id0);
        assert_eq!(r2.len(), 5);
    }

    #[test]
    fn test_deterministic_with_pinned_id() {
        // empty passwords, P = -1, fixed id0: O and U must be byte-stable
        let handler = StandardSecurityHandler::rc4_128bit();
        let id0: Vec<u8> = (0u8..16).collect();

        let o1 = handler.compute_owner_hash(b"", b"");
        let o2 = handler.compute_owner_hash(b"", b"");
        assert_eq!(o1, o2);

        let key1 = handler.compute_file_key(b"", &o1, -1, &id0);
        let key2 = handler.compute_file_key(b"", &o2, -1, &id0);
        assert_eq!(key1, key2);

        let u1 = handler.compute_user_hash(&key1, &id0);
        let u2 = handler.compute_user_hash(&key2, &id0);
        assert_eq!(u1, u2);
        assert_eq!(u1.len(), 32);
    }

    #[test]
    fn test_id_affects_key() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let o = handler.compute_owner_hash(b"", b"");
        let key_a = handler.compute_file_key(b"", &o, -1, b"aaaaaaaaaaaaaaaa");
        let key_b = handler.compute_file_key(b"", &o, -1, b"bbbbbbbbbbbbbbbb");
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn test_permissions_affect_key() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let o = handler.compute_owner_hash(b"", b"");
        let id0 = [7u8; 16];
        let all = handler.compute_file_key(b"", &o, -1, &id0);
        let none = handler.compute_file_key(b"", &o, -44, &id0);
        assert_ne!(all, none);
    }

    #[test]
    fn test_object_keys_differ_per_object() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let file_key = vec![0x11u8; 16];
        let a = handler.object_key(&file_key, ObjectId::new(1, 0));
        let b = handler.object_key(&file_key, ObjectId::new(2, 0));
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_object_key_truncation_for_short_keys() {
        let handler = StandardSecurityHandler::rc4_40bit();
        let file_key = vec![0x22u8; 5];
        let key = handler.object_key(&file_key, ObjectId::new(3, 0));
        assert_eq!(key.len(), 10);
    }
}
