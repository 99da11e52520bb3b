//! Text-format hstore parser using nom.
//!
//! # Syntax Overview
//!
//! ```text
//! "key"=>"value", "other" => NULL
//! ──┬──┬───┬───  ───┬───    ──┬─
//!   │  │   │        │         └── bare NULL (any case): null value
//!   │  │   │        └── whitespace allowed around `=>` and `,`
//!   │  │   └── quoted value: \" and \\ are the only escapes
//!   │  └── separator
//!   └── quoted key (never NULL)
//! ```
//!
//! An empty or all-whitespace string is an empty map. Every failure reports
//! the byte offset into the original input.

use nom::{
    Err as NomErr, IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, multispace0},
    combinator::{map, value},
    error::{ErrorKind as NomErrorKind, ParseError},
};

use crate::error::{DecodeError, ErrorKind};
use crate::value::Hstore;

/// Parse a complete text-format hstore.
pub fn decode_text(input: &str) -> Result<Hstore, DecodeError> {
    match parse_hstore(input) {
        Ok((_, hstore)) => Ok(hstore),
        Err(NomErr::Error(e) | NomErr::Failure(e)) => {
            Err(DecodeError::new(e.kind, input.len() - e.input.len()))
        }
        Err(NomErr::Incomplete(_)) => Err(DecodeError::new(ErrorKind::UnexpectedEnd, input.len())),
    }
}

/// Parser error carrying our own classification instead of nom's.
#[derive(Debug, Clone, PartialEq)]
struct TextError<'a> {
    input: &'a str,
    kind: ErrorKind,
}

impl<'a> ParseError<&'a str> for TextError<'a> {
    fn from_error_kind(input: &'a str, _kind: NomErrorKind) -> Self {
        let kind = if input.is_empty() {
            ErrorKind::UnexpectedEnd
        } else {
            ErrorKind::UnexpectedCharacter
        };
        Self { input, kind }
    }

    fn append(_input: &'a str, _kind: NomErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, TextError<'a>>;

fn fail<T>(input: &str, kind: ErrorKind) -> PResult<'_, T> {
    Err(NomErr::Failure(TextError { input, kind }))
}

/// Parse all pairs, requiring the whole input to be consumed.
fn parse_hstore(input: &str) -> PResult<'_, Hstore> {
    let (mut input, _) = multispace0(input)?;
    let mut hstore = Hstore::new();

    if input.is_empty() {
        return Ok((input, hstore));
    }

    loop {
        let (rest, (key, value)) = parse_pair(input)?;
        hstore.push(key, value);

        let (rest, _) = multispace0(rest)?;
        if rest.is_empty() {
            return Ok((rest, hstore));
        }

        let comma = rest;
        let rest = match char::<&str, TextError>(',')(rest) {
            Ok((rest, _)) => rest,
            Err(_) => return fail(rest, ErrorKind::UnexpectedCharacter),
        };

        let (rest, _) = multispace0(rest)?;
        if rest.is_empty() {
            return fail(comma, ErrorKind::DanglingComma);
        }
        input = rest;
    }
}

/// Parse `key => value`.
fn parse_pair(input: &str) -> PResult<'_, (String, Option<String>)> {
    let (input, key) = parse_key(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = parse_arrow(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_value(input)?;

    Ok((input, (key, value)))
}

/// Parse a key. Keys are always quoted; a bare NULL here is a null key.
fn parse_key(input: &str) -> PResult<'_, String> {
    if let Ok((rest, _)) = parse_null(input) {
        let bare = match rest.chars().next() {
            None => true,
            Some(c) => c.is_whitespace() || c == '=' || c == ',',
        };
        let kind = if bare {
            ErrorKind::NullKey
        } else {
            ErrorKind::UnexpectedCharacter
        };
        return fail(input, kind);
    }
    parse_quoted(input)
}

/// Parse the `=>` separator.
fn parse_arrow(input: &str) -> PResult<'_, &str> {
    if input.is_empty() {
        return fail(input, ErrorKind::UnexpectedEnd);
    }
    match tag::<&str, &str, TextError>("=>")(input) {
        Ok(ok) => Ok(ok),
        Err(_) => fail(input, ErrorKind::MissingSeparator),
    }
}

/// Parse a value: bare NULL or a quoted string.
fn parse_value(input: &str) -> PResult<'_, Option<String>> {
    alt((value(None, parse_null), map(parse_quoted, Some)))(input)
}

/// Parse the NULL keyword, case-insensitive.
fn parse_null(input: &str) -> PResult<'_, &str> {
    tag_no_case("NULL")(input)
}

/// Parse a double-quoted string, resolving `\"` and `\\`.
///
/// Everything else between the quotes is copied through untouched, so
/// multi-byte sequences survive as-is.
fn parse_quoted(input: &str) -> PResult<'_, String> {
    let (body, _) = char('"')(input)?;

    let mut out = String::new();
    let mut chunk_start = 0;
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                out.push_str(&body[chunk_start..i]);
                return Ok((&body[i + 1..], out));
            }
            '\\' => {
                out.push_str(&body[chunk_start..i]);
                match chars.next() {
                    Some((j, escaped @ ('"' | '\\'))) => {
                        out.push(escaped);
                        chunk_start = j + 1;
                    }
                    Some(_) => return fail(&body[i..], ErrorKind::InvalidEscape),
                    None => return fail(input, ErrorKind::UnterminatedQuote),
                }
            }
            _ => {}
        }
    }

    fail(input, ErrorKind::UnterminatedQuote)
}
