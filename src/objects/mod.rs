mod dictionary;
mod primitive;
mod serialize;

pub use dictionary::Dictionary;
pub use primitive::{
    IndirectObject, Name, ObjectId, PdfObject, PdfStream, PdfString, StringFormat,
};
