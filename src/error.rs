use crate::objects::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid PDF header")]
    InvalidHeader,

    #[error("invalid cross-reference table: {0}")]
    InvalidXref(String),

    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("bad object reference: {0}")]
    BadReference(String),

    #[error("document must be decrypted first")]
    NeedsPassword,

    #[error("invalid document catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid page tree node: {0}")]
    InvalidPageNode(String),

    #[error("invalid outline entry: {0}")]
    InvalidOutline(String),

    #[error("circular outline reference")]
    CircularOutline,

    #[error("page number {requested} out of range (document has {count} pages)")]
    PageOutOfRange { requested: usize, count: usize },

    #[error("unresolved reference reached the writer: {0}")]
    UnresolvedReference(ObjectId),

    #[error("invalid AcroForm input: {0}")]
    InvalidAcroForm(String),

    #[error("form field page points outside the written document")]
    FormFieldOutsideWriter,

    #[error("unsupported encryption: {0}")]
    UnsupportedEncryption(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;
