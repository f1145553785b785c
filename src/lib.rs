//! # pdfgraph
//!
//! A PDF document object-graph engine: reads a PDF from a seekable byte
//! source into a resolved, in-memory indirect-object graph, and writes a
//! graph back out as a PDF 1.3 byte stream with optional Standard Security
//! Handler encryption (V=2, R=3, 128-bit RC4).
//!
//! ## Features
//!
//! - **Reference resolution**: on-demand lookup of `(number, generation)`
//!   references with caching, cycle-safe graph traversal and per-key
//!   follow policies
//! - **Page tree flattening**: the `/Pages` tree becomes an ordered page
//!   list with `/Parent` back-edges fixed and ancestor attributes
//!   inherited into leaves
//! - **Serialization**: deterministic object numbering, exact xref byte
//!   offsets, insertion-ordered dictionaries
//! - **Encryption**: Standard Security Handler password algorithms,
//!   per-object RC4 keying on write, user and owner password
//!   authentication on read
//!
//! ## Reading
//!
//! ```rust,no_run
//! use pdfgraph::PdfReader;
//! use std::fs::File;
//!
//! # fn main() -> pdfgraph::Result<()> {
//! let file = File::open("document.pdf")?;
//! let mut reader = PdfReader::new(file)?;
//!
//! if reader.is_encrypted() {
//!     if !reader.decrypt(b"password")? {
//!         return Err(pdfgraph::PdfError::NeedsPassword);
//!     }
//! }
//!
//! println!("pages: {}", reader.num_pages()?);
//! let first = reader.page(1)?;
//! println!("first page dict: {:?}", first.object.borrow());
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing
//!
//! ```rust,no_run
//! use pdfgraph::{PdfReader, PdfWriter};
//! use std::fs::File;
//!
//! # fn main() -> pdfgraph::Result<()> {
//! let mut reader = PdfReader::new(File::open("in.pdf")?)?;
//! let mut writer = PdfWriter::new();
//!
//! for n in 1..=reader.num_pages()? {
//!     let page = reader.page(n)?;
//!     writer.add_page(&page)?;
//! }
//!
//! writer.encrypt(b"user", b"owner", None)?;
//! writer.write(File::create("out.pdf")?)?;
//! # Ok(())
//! # }
//! ```

pub mod encryption;
pub mod error;
pub mod objects;
pub mod parser;
pub mod reader;
pub mod writer;

pub use encryption::AccessPermissions;
pub use error::{PdfError, Result};
pub use objects::{
    Dictionary, IndirectObject, Name, ObjectId, PdfObject, PdfStream, PdfString, StringFormat,
};
pub use parser::PdfParser;
pub use reader::PdfReader;
pub use writer::{EncryptOptions, PdfWriter};
