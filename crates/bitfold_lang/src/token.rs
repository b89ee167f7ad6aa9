//! S-expression tokenizer.
//!
//! Three token shapes: `(`, `)`, and atoms (maximal runs of
//! non-paren, non-whitespace bytes). Every token carries its byte
//! span so the parser can report precise locations.

use bitfold_base::Span;

/// A single token with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

/// A peekable tokenizer over a source line.
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    peeked: Option<(Token<'a>, Span)>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            source,
            pos: 0,
            peeked: None,
        }
    }

    /// The span just past the end of input, for EOF diagnostics.
    pub fn eof_span(&self) -> Span {
        Span::new(self.source.len(), self.source.len())
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Option<(Token<'a>, Span)> {
        if self.peeked.is_none() {
            self.peeked = self.scan();
        }
        self.peeked
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self) -> Option<(Token<'a>, Span)> {
        self.peek();
        self.peeked.take()
    }

    fn scan(&mut self) -> Option<(Token<'a>, Span)> {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        match bytes[self.pos] {
            b'(' => {
                self.pos += 1;
                Some((Token::Open, Span::new(start, self.pos)))
            }
            b')' => {
                self.pos += 1;
                Some((Token::Close, Span::new(start, self.pos)))
            }
            _ => {
                while self.pos < bytes.len()
                    && !bytes[self.pos].is_ascii_whitespace()
                    && bytes[self.pos] != b'('
                    && bytes[self.pos] != b')'
                {
                    self.pos += 1;
                }
                Some((
                    Token::Atom(&self.source[start..self.pos]),
                    Span::new(start, self.pos),
                ))
            }
        }
    }
}
