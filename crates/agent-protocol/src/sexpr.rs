//! Minimal S-expression reader for server messages.

use crate::error::ParseError;

/// Deepest list nesting accepted. Server messages stay well below this.
pub const MAX_DEPTH: usize = 64;

/// A parsed S-expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    /// Parses one top-level expression. Trailing NUL bytes and whitespace
    /// (servers pad datagrams) are ignored.
    pub fn parse(text: &str) -> Result<Sexp, ParseError> {
        let text = text.trim_end_matches('\0').trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let bytes = text.as_bytes();
        let mut pos = 0;
        let node = parse_node(text, bytes, &mut pos, 0)?;
        skip_ws(bytes, &mut pos);
        if pos != bytes.len() {
            return Err(ParseError::Unbalanced(pos));
        }
        Ok(node)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(s) => Some(s),
            Sexp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            Sexp::Atom(_) => None,
        }
    }

    /// Head keyword of a list, e.g. `sense_body` for `(sense_body 10 ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_atom()?.parse().ok()
    }

    pub fn as_u64(&self) -> Option<u64> {
        let atom = self.as_atom()?;
        atom.parse::<u64>()
            .ok()
            .or_else(|| atom.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
    }

    /// Finds the first child list whose head is `key`.
    pub fn child(&self, key: &str) -> Option<&Sexp> {
        self.as_list()?
            .iter()
            .find(|item| item.head() == Some(key))
    }
}

fn skip_ws(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && (bytes[*pos].is_ascii_whitespace() || bytes[*pos] == 0) {
        *pos += 1;
    }
}

fn parse_node(text: &str, bytes: &[u8], pos: &mut usize, depth: usize) -> Result<Sexp, ParseError> {
    skip_ws(bytes, pos);
    match bytes.get(*pos) {
        None => Err(ParseError::Unbalanced(*pos)),
        Some(b'(') => {
            if depth >= MAX_DEPTH {
                return Err(ParseError::TooDeep(*pos));
            }
            *pos += 1;
            let mut items = Vec::new();
            loop {
                skip_ws(bytes, pos);
                match bytes.get(*pos) {
                    None => return Err(ParseError::Unbalanced(*pos)),
                    Some(b')') => {
                        *pos += 1;
                        return Ok(Sexp::List(items));
                    }
                    Some(_) => items.push(parse_node(text, bytes, pos, depth + 1)?),
                }
            }
        }
        Some(b')') => Err(ParseError::Unbalanced(*pos)),
        Some(b'"') => {
            let start = *pos + 1;
            let end = text[start..]
                .find('"')
                .map(|offset| start + offset)
                .ok_or(ParseError::UnterminatedString)?;
            *pos = end + 1;
            Ok(Sexp::Atom(text[start..end].to_string()))
        }
        Some(_) => {
            let start = *pos;
            while *pos < bytes.len()
                && !bytes[*pos].is_ascii_whitespace()
                && bytes[*pos] != b'('
                && bytes[*pos] != b')'
                && bytes[*pos] != 0
            {
                *pos += 1;
            }
            Ok(Sexp::Atom(text[start..*pos].to_string()))
        }
    }
}
