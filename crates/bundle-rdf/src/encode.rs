use crate::term::{Literal, Term, Triple};

/// Renders a term or triple to its canonical N-Triples token text
/// (W3C N-Triples grammar, `\u`-escaped above ASCII rather than emitted
/// verbatim so the output is a stable byte sequence across locales).
pub trait NTriplesEncode {
    fn to_ntriples(&self) -> String;
}

impl NTriplesEncode for Term {
    fn to_ntriples(&self) -> String {
        match self {
            Term::Iri(uri) => format!("<{}>", escape_iri(uri)),
            Term::BlankNode(id) => format!("_:{id}"),
            Term::Literal(literal) => literal.to_ntriples(),
        }
    }
}

impl NTriplesEncode for Literal {
    fn to_ntriples(&self) -> String {
        let body = format!("\"{}\"", escape_string(&self.lexical));
        if let Some(lang) = &self.lang {
            format!("{body}@{lang}")
        } else if let Some(datatype) = &self.datatype {
            format!("{body}^^<{}>", escape_iri(datatype))
        } else {
            body
        }
    }
}

impl NTriplesEncode for Triple {
    fn to_ntriples(&self) -> String {
        format!(
            "{} {} {} .",
            self.subject.to_ntriples(),
            self.predicate.to_ntriples(),
            self.object.to_ntriples()
        )
    }
}

fn escape_iri(value: &str) -> String {
    escape_common(value, false)
}

fn escape_string(value: &str) -> String {
    escape_common(value, true)
}

fn escape_common(value: &str, is_string: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' if is_string => out.push_str("\\\""),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_iri_triple() {
        let triple = Triple {
            subject: Term::iri("http://example.org/s"),
            predicate: Term::iri("http://example.org/p"),
            object: Term::iri("http://example.org/o"),
        };
        assert_eq!(
            triple.to_ntriples(),
            "<http://example.org/s> <http://example.org/p> <http://example.org/o> ."
        );
    }

    #[test]
    fn encodes_lang_literal() {
        let t = Term::lang_literal("hello", "en");
        assert_eq!(t.to_ntriples(), "\"hello\"@en");
    }

    #[test]
    fn encodes_typed_literal() {
        let t = Term::typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer");
        assert_eq!(
            t.to_ntriples(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn escapes_quotes_and_newlines() {
        let t = Term::plain_literal("a \"quoted\"\nline");
        assert_eq!(t.to_ntriples(), "\"a \\\"quoted\\\"\\nline\"");
    }

    #[test]
    fn encodes_blank_node() {
        let t = Term::blank("b0");
        assert_eq!(t.to_ntriples(), "_:b0");
    }
}
