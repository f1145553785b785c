//! PDF file parsing: tokenizer, raw object parser, cross-reference tables
//! and the `PdfParser` facade the reader drives.

pub mod lexer;
pub mod objects;
pub mod xref;

use crate::encryption::Crypter;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, IndirectObject, ObjectId, PdfObject};
use lexer::{Lexer, Token};
use log::{debug, error};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use xref::XrefTable;

/// Low-level document access: resolves `(number, generation)` references to
/// identity-bearing object handles, caching by object number. Construction
/// reads the header, the cross-reference table chain and the trailer; if
/// the trailer names an /Encrypt dictionary, a crypter is built from it and
/// every subsequent lookup is decrypted once authenticated.
pub struct PdfParser<R: Read + Seek> {
    reader: R,
    xref: XrefTable,
    pub trailer: Dictionary,
    pub obj_cache: HashMap<u32, PdfObject>,
    pub crypter: Option<Crypter>,
    /// The encryption dictionary itself is never decrypted.
    encrypt_id: Option<ObjectId>,
}

impl<R: Read + Seek> PdfParser<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        check_header(&mut reader)?;
        let xref = XrefTable::parse(&mut reader)?;
        let trailer = xref.trailer.clone();

        let mut parser = Self {
            reader,
            xref,
            trailer,
            obj_cache: HashMap::new(),
            crypter: None,
            encrypt_id: None,
        };

        if let Some(encrypt) = parser.trailer.get("Encrypt").cloned() {
            let enc_dict = match encrypt {
                PdfObject::Reference(id) => {
                    parser.encrypt_id = Some(id);
                    let obj = parser.lookup_by_reference(id)?;
                    match obj {
                        PdfObject::Indirect(io) => match &*io.object.borrow() {
                            PdfObject::Dictionary(dict) => dict.clone(),
                            _ => {
                                return Err(PdfError::UnsupportedEncryption(
                                    "/Encrypt is not a dictionary".to_string(),
                                ))
                            }
                        },
                        _ => {
                            return Err(PdfError::UnsupportedEncryption(
                                "/Encrypt is not a dictionary".to_string(),
                            ))
                        }
                    }
                }
                PdfObject::Dictionary(dict) => dict,
                _ => {
                    return Err(PdfError::UnsupportedEncryption(
                        "/Encrypt is not a dictionary".to_string(),
                    ))
                }
            };
            let id0 = first_file_identifier(&parser.trailer);
            debug!("document is encrypted, building crypter");
            parser.crypter = Some(Crypter::from_encrypt_dict(&enc_dict, id0)?);
        }

        Ok(parser)
    }

    pub fn is_encrypted(&self) -> bool {
        self.crypter.is_some()
    }

    /// Try `password`, then the empty password. Returns whether
    /// authentication succeeded; lookups decrypt from then on.
    pub fn decrypt(&mut self, password: &[u8]) -> Result<bool> {
        let crypter = match self.crypter.as_mut() {
            Some(crypter) => crypter,
            None => return Ok(true),
        };
        if crypter.authenticate(password) {
            return Ok(true);
        }
        if !password.is_empty() && crypter.authenticate(b"") {
            return Ok(true);
        }
        Ok(false)
    }

    /// Resolve a reference to its object handle, parsing and caching on
    /// first use. Free entries resolve to `Null`.
    pub fn lookup_by_reference(&mut self, id: ObjectId) -> Result<PdfObject> {
        if let Some(cached) = self.obj_cache.get(&id.number()) {
            return Ok(cached.clone());
        }
        debug!("lookup {id}");

        let entry = *self.xref.get(id.number()).ok_or_else(|| {
            PdfError::BadReference(format!("{id} not present in xref table"))
        })?;
        if !entry.in_use {
            self.obj_cache.insert(id.number(), PdfObject::Null);
            return Ok(PdfObject::Null);
        }
        if entry.generation != id.generation() {
            return Err(PdfError::BadReference(format!(
                "{id} generation mismatch (xref has {})",
                entry.generation
            )));
        }

        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut lexer = Lexer::new(&mut self.reader);

        let number = match lexer.next_token()? {
            Token::Integer(n) => n,
            other => {
                return Err(PdfError::Syntax {
                    position: entry.offset,
                    message: format!("expected object number, found {other:?}"),
                })
            }
        };
        let generation = match lexer.next_token()? {
            Token::Integer(g) => g,
            other => {
                return Err(PdfError::Syntax {
                    position: entry.offset,
                    message: format!("expected generation number, found {other:?}"),
                })
            }
        };
        if number != id.number() as i64 || generation != id.generation() as i64 {
            return Err(PdfError::BadReference(format!(
                "object at offset {} is {number} {generation}, expected {id}",
                entry.offset
            )));
        }
        if lexer.next_token()? != Token::Obj {
            return Err(PdfError::Syntax {
                position: entry.offset,
                message: "expected 'obj' keyword".to_string(),
            });
        }

        let raw = objects::parse_object(&mut lexer)?;

        if lexer.next_token()? != Token::EndObj {
            return Err(PdfError::Syntax {
                position: entry.offset,
                message: "expected 'endobj' keyword".to_string(),
            });
        }

        let handle = match raw {
            PdfObject::Stream(stream) => {
                stream.set_id(id);
                PdfObject::Stream(stream)
            }
            other => PdfObject::Indirect(IndirectObject::with_id(id, other)),
        };

        if let Some(crypter) = self.crypter.as_mut() {
            if crypter.authenticated && self.encrypt_id != Some(id) {
                crypter.process_object(&handle, id)?;
            }
        }

        self.obj_cache.insert(id.number(), handle.clone());
        Ok(handle)
    }

    /// Resolve `obj` if it is a reference, otherwise hand it back.
    pub fn trace(&mut self, obj: &PdfObject) -> Result<PdfObject> {
        match obj {
            PdfObject::Reference(id) => self.lookup_by_reference(*id),
            other => Ok(other.clone()),
        }
    }
}

/// The first element of the trailer /ID array, as raw bytes. Absent or
/// malformed identifiers degrade to empty (matching the key derivation's
/// treatment of a missing ID).
fn first_file_identifier(trailer: &Dictionary) -> Vec<u8> {
    trailer
        .get("ID")
        .and_then(|obj| obj.as_array())
        .and_then(|ids| ids.first())
        .and_then(|first| first.as_string())
        .map(|s| s.data.clone())
        .unwrap_or_default()
}

fn check_header<R: Read + Seek>(reader: &mut R) -> Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; 16];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let head = &buf[..filled];
    if !head.starts_with(b"%PDF-") {
        error!("missing %PDF- header");
        return Err(PdfError::InvalidHeader);
    }
    let version: String = head[5..]
        .iter()
        .map(|&b| b as char)
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if version.parse::<f64>().is_err() {
        return Err(PdfError::InvalidHeader);
    }
    debug!("PDF version {version}");
    Ok(())
}
