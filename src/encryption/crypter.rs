//! Document-level crypter: binds handler parameters to one file and walks
//! object graphs applying the per-object cipher.

use crate::encryption::{rc4_apply, StandardSecurityHandler};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, ObjectId, PdfObject};
use log::debug;
use std::collections::HashSet;

/// Encryption state for one document. Holds the handler parameters, the
/// /O and /U entries, the file key once authenticated, and the identity
/// set that keeps every node from being keyed twice.
pub struct Crypter {
    handler: StandardSecurityHandler,
    pub p: i32,
    pub o: Vec<u8>,
    pub u: Vec<u8>,
    pub id0: Vec<u8>,
    pub encrypt_metadata: bool,
    pub encryption_key: Vec<u8>,
    pub authenticated: bool,
    processed: HashSet<usize>,
}

impl Crypter {
    /// Writer-side constructor: V=2/R=3/128-bit, key material derived
    /// immediately from the passwords.
    pub fn for_writing(p: i32, id0: Vec<u8>, user_password: &[u8], owner_password: &[u8]) -> Self {
        let handler = StandardSecurityHandler::rc4_128bit();
        let o = handler.compute_owner_hash(owner_password, user_password);
        let key = handler.compute_file_key(user_password, &o, p, &id0);
        let u = handler.compute_user_hash(&key, &id0);
        Self {
            handler,
            p,
            o,
            u,
            id0,
            encrypt_metadata: true,
            encryption_key: key,
            authenticated: true,
            processed: HashSet::new(),
        }
    }

    /// Reader-side constructor from the /Encrypt dictionary and the first
    /// trailer /ID entry. Only the Standard filter with V=1/2 is accepted.
    pub fn from_encrypt_dict(dict: &Dictionary, id0: Vec<u8>) -> Result<Self> {
        let filter = dict
            .get("Filter")
            .and_then(|obj| obj.as_name())
            .map(|name| name.as_str().to_string())
            .unwrap_or_default();
        if filter != "Standard" {
            return Err(PdfError::UnsupportedEncryption(format!(
                "security handler filter '{filter}'"
            )));
        }

        let v = dict.get("V").and_then(|obj| obj.as_integer()).unwrap_or(0);
        if !(1..=2).contains(&v) {
            return Err(PdfError::UnsupportedEncryption(format!("algorithm V={v}")));
        }
        let r = dict
            .get("R")
            .and_then(|obj| obj.as_integer())
            .ok_or_else(|| PdfError::UnsupportedEncryption("missing /R".to_string()))?;
        let length_bits = dict
            .get("Length")
            .and_then(|obj| obj.as_integer())
            .unwrap_or(40);
        if length_bits % 8 != 0 {
            return Err(PdfError::UnsupportedEncryption(format!(
                "key length {length_bits} bits"
            )));
        }
        let handler = StandardSecurityHandler::new(r as u8, (length_bits / 8) as usize)?;

        let p = dict
            .get("P")
            .and_then(|obj| obj.as_integer())
            .unwrap_or(-1) as i32;
        let o = dict
            .get("O")
            .and_then(|obj| obj.as_string())
            .map(|s| s.data.clone())
            .ok_or_else(|| PdfError::UnsupportedEncryption("missing /O".to_string()))?;
        let u = dict
            .get("U")
            .and_then(|obj| obj.as_string())
            .map(|s| s.data.clone())
            .ok_or_else(|| PdfError::UnsupportedEncryption("missing /U".to_string()))?;
        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(|obj| obj.as_bool())
            .unwrap_or(true);

        Ok(Self {
            handler,
            p,
            o,
            u,
            id0,
            encrypt_metadata,
            encryption_key: Vec::new(),
            authenticated: false,
            processed: HashSet::new(),
        })
    }

    pub fn revision(&self) -> u8 {
        self.handler.revision()
    }

    /// The /V value matching the handler parameters.
    pub fn version(&self) -> i64 {
        if self.handler.key_length() > 5 {
            2
        } else {
            1
        }
    }

    pub fn key_length_bits(&self) -> i64 {
        (self.handler.key_length() * 8) as i64
    }

    /// Try `password` as the user password, then as the owner password.
    /// Stores the file key and flips `authenticated` on success.
    pub fn authenticate(&mut self, password: &[u8]) -> bool {
        if self.check_user_password(password) {
            debug!("authenticated with user password");
            self.authenticated = true;
            return true;
        }
        // Owner path: undo algorithm 3 to recover the padded user password,
        // then re-run the user check with it.
        let recovered = self.recover_user_password(password);
        if self.check_user_password(&recovered) {
            debug!("authenticated with owner password");
            self.authenticated = true;
            return true;
        }
        false
    }

    fn check_user_password(&mut self, password: &[u8]) -> bool {
        let key = self
            .handler
            .compute_file_key(password, &self.o, self.p, &self.id0);
        let computed = self.handler.compute_user_hash(&key, &self.id0);
        let matches = if self.handler.revision() >= 3 {
            // only the first 16 bytes of /U are significant
            self.u.len() >= 16 && computed[..16] == self.u[..16]
        } else {
            computed == self.u
        };
        if matches {
            self.encryption_key = key;
        }
        matches
    }

    fn recover_user_password(&self, owner_password: &[u8]) -> Vec<u8> {
        let padded = StandardSecurityHandler::pad_password(owner_password);
        let mut hash = md5::compute(padded).0.to_vec();
        if self.handler.revision() >= 3 {
            for _ in 0..50 {
                hash = md5::compute(&hash).0.to_vec();
            }
        }
        let key = &hash[..self.handler.key_length()];

        let mut out = self.o.clone();
        if self.handler.revision() >= 3 {
            for i in (0u8..=19).rev() {
                let iter_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
                rc4_apply(&iter_key, &mut out);
            }
        } else {
            rc4_apply(key, &mut out);
        }
        out
    }

    /// Key every string and stream payload reachable from `obj` under the
    /// per-object key, each node at most once. RC4 is symmetric, so the
    /// same walk decrypts.
    pub fn process_object(&mut self, obj: &PdfObject, id: ObjectId) -> Result<()> {
        match obj {
            PdfObject::Indirect(io) => {
                if !self.processed.insert(std::rc::Rc::as_ptr(io) as usize) {
                    return Ok(());
                }
                // nested handles carry their own assigned numbers
                let own = io.id();
                let use_id = if own.number() > 0 { own } else { id };
                let mut inner = io.object.borrow_mut();
                self.process_value(&mut inner, use_id)
            }
            PdfObject::Stream(stream) => {
                if !self.processed.insert(std::rc::Rc::as_ptr(stream) as usize) {
                    return Ok(());
                }
                let own = stream.id();
                let use_id = if own.number() > 0 { own } else { id };
                let object_key = self.handler.object_key(&self.encryption_key, use_id);
                rc4_apply(&object_key, &mut stream.data.borrow_mut());
                let mut dict = stream.dict.borrow_mut();
                self.process_dict(&mut dict, use_id)
            }
            _ => Ok(()),
        }
    }

    fn process_value(&mut self, value: &mut PdfObject, id: ObjectId) -> Result<()> {
        match value {
            PdfObject::String(s) => {
                let object_key = self.handler.object_key(&self.encryption_key, id);
                rc4_apply(&object_key, &mut s.data);
                Ok(())
            }
            PdfObject::Array(items) => {
                for item in items.iter_mut() {
                    self.process_value(item, id)?;
                }
                Ok(())
            }
            PdfObject::Dictionary(dict) => self.process_dict(dict, id),
            PdfObject::Indirect(_) | PdfObject::Stream(_) => {
                let handle = value.clone();
                self.process_object(&handle, id)
            }
            _ => Ok(()),
        }
    }

    fn process_dict(&mut self, dict: &mut Dictionary, id: ObjectId) -> Result<()> {
        for (_, value) in dict.iter_mut() {
            self.process_value(value, id)?;
        }
        Ok(())
    }
}
