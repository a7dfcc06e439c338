use thiserror::Error;

use crate::term::{Literal, Term, Triple};

/// Errors parsing a line of the canonical N-Triples encoding produced by
/// [`crate::NTriplesEncode`]. Not a general-purpose N-Triples parser: it
/// only needs to read back what this crate itself writes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NTriplesParseError {
    #[error("line {0}: malformed triple")]
    MalformedTriple(usize),
    #[error("line {0}: malformed term")]
    MalformedTerm(usize),
}

/// Parses a canonical N-Triples document (one triple per line, as produced
/// by [`crate::canonicalize`]) back into [`Triple`]s.
pub fn parse_ntriples(text: &str) -> Result<Vec<Triple>, NTriplesParseError> {
    let mut triples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line = line
            .strip_suffix('.')
            .ok_or(NTriplesParseError::MalformedTriple(index))?
            .trim();

        let mut rest = line;
        let (subject, next) = parse_term(rest, index)?;
        rest = next.trim_start();
        let (predicate, next) = parse_term(rest, index)?;
        rest = next.trim_start();
        let (object, next) = parse_term(rest, index)?;
        if !next.trim().is_empty() {
            return Err(NTriplesParseError::MalformedTriple(index));
        }

        triples.push(Triple {
            subject,
            predicate,
            object,
        });
    }
    Ok(triples)
}

fn parse_term(input: &str, line: usize) -> Result<(Term, &str), NTriplesParseError> {
    if let Some(rest) = input.strip_prefix('<') {
        let end = rest.find('>').ok_or(NTriplesParseError::MalformedTerm(line))?;
        let iri = unescape(&rest[..end]);
        return Ok((Term::Iri(iri), &rest[end + 1..]));
    }
    if let Some(rest) = input.strip_prefix("_:") {
        let end = rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(rest.len());
        return Ok((Term::BlankNode(rest[..end].to_owned()), &rest[end..]));
    }
    if let Some(rest) = input.strip_prefix('"') {
        let (lexical, after_quote) = parse_quoted(rest, line)?;
        if let Some(tail) = after_quote.strip_prefix("^^<") {
            let end = tail.find('>').ok_or(NTriplesParseError::MalformedTerm(line))?;
            let datatype = unescape(&tail[..end]);
            return Ok((
                Term::Literal(Literal {
                    lexical,
                    lang: None,
                    datatype: Some(datatype),
                }),
                &tail[end + 1..],
            ));
        }
        if let Some(tail) = after_quote.strip_prefix('@') {
            let end = tail.find(|c: char| c.is_whitespace()).unwrap_or(tail.len());
            return Ok((
                Term::Literal(Literal {
                    lexical,
                    lang: Some(tail[..end].to_owned()),
                    datatype: None,
                }),
                &tail[end..],
            ));
        }
        return Ok((
            Term::Literal(Literal {
                lexical,
                lang: None,
                datatype: None,
            }),
            after_quote,
        ));
    }
    Err(NTriplesParseError::MalformedTerm(line))
}

fn parse_quoted(input: &str, line: usize) -> Result<(String, &str), NTriplesParseError> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &input[i + 1..])),
            '\\' => {
                let (_, escaped) = chars.next().ok_or(NTriplesParseError::MalformedTerm(line))?;
                match escaped {
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        let hex: String = (0..4)
                            .filter_map(|_| chars.next().map(|(_, c)| c))
                            .collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| NTriplesParseError::MalformedTerm(line))?;
                        out.push(char::from_u32(code).ok_or(NTriplesParseError::MalformedTerm(line))?);
                    }
                    _ => return Err(NTriplesParseError::MalformedTerm(line)),
                }
            }
            _ => out.push(c),
        }
    }
    Err(NTriplesParseError::MalformedTerm(line))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
