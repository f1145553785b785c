//! Raw object parsing: tokens to `PdfObject` values.
//!
//! Objects come out exactly as written, with references left as
//! `PdfObject::Reference`; resolving them is the reader's job.

use super::lexer::{Lexer, Token};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Name, ObjectId, PdfObject, PdfStream, PdfString};
use std::io::Read;

pub(crate) fn parse_object<R: Read>(lexer: &mut Lexer<R>) -> Result<PdfObject> {
    let token = lexer.next_token()?;
    parse_from_token(lexer, token)
}

fn parse_from_token<R: Read>(lexer: &mut Lexer<R>, token: Token) -> Result<PdfObject> {
    match token {
        Token::Null => Ok(PdfObject::Null),
        Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
        Token::Integer(i) => maybe_reference(lexer, i),
        Token::Real(r) => Ok(PdfObject::Real(r)),
        Token::String(data, format) => Ok(PdfObject::String(PdfString { data, format })),
        Token::Name(name) => Ok(PdfObject::Name(Name(name))),
        Token::ArrayStart => parse_array(lexer),
        Token::DictStart => parse_dictionary_or_stream(lexer),
        other => Err(PdfError::Syntax {
            position: lexer.position(),
            message: format!("expected object, found {other:?}"),
        }),
    }
}

/// Collapse `n g R` into a reference; anything else leaves the integer
/// alone and pushes the lookahead back.
fn maybe_reference<R: Read>(lexer: &mut Lexer<R>, value: i64) -> Result<PdfObject> {
    let second = lexer.next_token()?;
    if let Token::Integer(generation) = second {
        let third = lexer.next_token()?;
        if third == Token::R
            && (0..=u32::MAX as i64).contains(&value)
            && (0..=u16::MAX as i64).contains(&generation)
        {
            return Ok(PdfObject::Reference(ObjectId::new(
                value as u32,
                generation as u16,
            )));
        }
        lexer.push_token(third);
        lexer.push_token(Token::Integer(generation));
    } else {
        lexer.push_token(second);
    }
    Ok(PdfObject::Integer(value))
}

fn parse_array<R: Read>(lexer: &mut Lexer<R>) -> Result<PdfObject> {
    let mut items = Vec::new();
    loop {
        let token = lexer.next_token()?;
        if token == Token::ArrayEnd {
            break;
        }
        items.push(parse_from_token(lexer, token)?);
    }
    Ok(PdfObject::Array(items))
}

fn parse_dictionary_or_stream<R: Read>(lexer: &mut Lexer<R>) -> Result<PdfObject> {
    let dict = parse_dictionary_body(lexer)?;

    let token = lexer.next_token()?;
    if token != Token::Stream {
        lexer.push_token(token);
        return Ok(PdfObject::Dictionary(dict));
    }

    // The payload length must be a direct integer; a reference-valued
    // /Length cannot be resolved mid-parse.
    let length = dict
        .get("Length")
        .and_then(|obj| obj.as_integer())
        .ok_or_else(|| PdfError::Syntax {
            position: lexer.position(),
            message: "stream /Length must be a direct integer".to_string(),
        })?;
    if length < 0 {
        return Err(PdfError::Syntax {
            position: lexer.position(),
            message: "negative stream /Length".to_string(),
        });
    }

    let data = lexer.read_stream_data(length as usize)?;

    let token = lexer.next_token()?;
    if token != Token::EndStream {
        return Err(PdfError::Syntax {
            position: lexer.position(),
            message: format!("expected endstream, found {token:?}"),
        });
    }

    Ok(PdfObject::Stream(PdfStream::new(dict, data)))
}

fn parse_dictionary_body<R: Read>(lexer: &mut Lexer<R>) -> Result<Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let token = lexer.next_token()?;
        match token {
            Token::DictEnd => break,
            Token::Name(key) => {
                let value = parse_object(lexer)?;
                dict.set(Name(key), value);
            }
            other => {
                return Err(PdfError::Syntax {
                    position: lexer.position(),
                    message: format!("expected dictionary key or '>>', found {other:?}"),
                })
            }
        }
    }
    Ok(dict)
}
