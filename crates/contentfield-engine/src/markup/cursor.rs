use crate::{FieldError, Result};

/// Byte cursor over document text, used by the tag lexers.
///
/// Positions are absolute byte offsets into the document so errors point at
/// the right place.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The whole document.
    pub s: &'a str,
    /// Current byte offset into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str, i: usize) -> Self {
        Self { s, i }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.s.as_bytes()[self.i.min(self.s.len())..].starts_with(pat.as_bytes())
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        Some(b)
    }

    /// Consume `pat` if the input continues with it.
    pub fn eat(&mut self, pat: &str) -> bool {
        if self.starts_with(pat) {
            self.i += pat.len();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, pat: &str) -> Result<()> {
        if self.eat(pat) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{pat}`")))
        }
    }

    pub fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.i += 1;
        }
    }

    /// Consume an identifier made of ASCII letters, digits, `_` and `-`
    /// that starts with a letter or `_`.
    pub fn ident(&mut self) -> Option<&'a str> {
        let start = self.i;
        if !self.peek().is_some_and(|b| b.is_ascii_alphabetic() || b == b'_') {
            return None;
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            self.i += 1;
        }
        Some(&self.s[start..self.i])
    }

    /// Consume bytes up to (not including) the next `stop` byte.
    pub fn take_until(&mut self, stop: u8) -> Option<&'a str> {
        let start = self.i;
        let len = self.s.as_bytes()[start..].iter().position(|&b| b == stop)?;
        self.i += len;
        Some(&self.s[start..self.i])
    }

    pub fn error(&self, message: impl Into<String>) -> FieldError {
        FieldError::syntax(self.i, message)
    }
}
