//! Wire serialization per ISO 32000-1 Section 7.3.
//!
//! Indirect and stream handles serialize as `n g R`; emitting their bodies
//! is the writer's job.

use crate::objects::{Dictionary, Name, PdfObject, StringFormat};

impl PdfObject {
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_wire(&mut out);
        out
    }

    pub fn write_wire(&self, out: &mut Vec<u8>) {
        match self {
            PdfObject::Null => out.extend_from_slice(b"null"),
            PdfObject::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            PdfObject::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            PdfObject::Real(r) => write_real(*r, out),
            PdfObject::Name(name) => write_name(name, out),
            PdfObject::String(s) => match s.format {
                StringFormat::Literal => write_literal_string(&s.data, out),
                StringFormat::Hexadecimal => write_hex_string(&s.data, out),
            },
            PdfObject::Array(items) => {
                out.push(b'[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(b' ');
                    }
                    item.write_wire(out);
                }
                out.push(b']');
            }
            PdfObject::Dictionary(dict) => dict.write_wire(out),
            PdfObject::Reference(id) => out.extend_from_slice(id.to_string().as_bytes()),
            PdfObject::Indirect(io) => out.extend_from_slice(io.id().to_string().as_bytes()),
            PdfObject::Stream(s) => out.extend_from_slice(s.id().to_string().as_bytes()),
        }
    }
}

impl Dictionary {
    pub(crate) fn write_wire(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"<<");
        for (key, value) in self.iter() {
            out.push(b' ');
            write_name(key, out);
            out.push(b' ');
            value.write_wire(out);
        }
        out.extend_from_slice(b" >>");
    }
}

fn write_real(value: f64, out: &mut Vec<u8>) {
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    out.extend_from_slice(trimmed.as_bytes());
}

fn write_name(name: &Name, out: &mut Vec<u8>) {
    out.push(b'/');
    // The lexer decodes each name byte to its Latin-1 codepoint, one char
    // per byte; invert that mapping here rather than UTF-8-encoding the
    // string, so high bytes round-trip as a single #hh escape.
    for ch in name.as_str().chars() {
        let byte = ch as u32 as u8;
        // Regular printable bytes pass through; delimiters, whitespace, '#'
        // and everything outside 0x21..=0x7e use the #hh escape.
        let special = matches!(byte, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#');
        if special || !(0x21..=0x7e).contains(&byte) {
            out.extend_from_slice(format!("#{byte:02x}").as_bytes());
        } else {
            out.push(byte);
        }
    }
}

fn write_literal_string(data: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &byte in data {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn write_hex_string(data: &[u8], out: &mut Vec<u8>) {
    out.push(b'<');
    for byte in data {
        out.extend_from_slice(format!("{byte:02x}").as_bytes());
    }
    out.push(b'>');
}
