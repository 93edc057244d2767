//! Resumable JSON tokenizer.
//!
//! Bytes arrive in arbitrary chunks through [`Lexer::feed`]; [`Lexer::next_token`]
//! hands out a token only once it is complete, so a chunk boundary can fall
//! in the middle of a string, a number or a literal.

use crate::error::ProtocolError;

/// Upper bound on input held back while waiting for the rest of a token.
pub const MAX_PENDING: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    ObjectBegin,
    ObjectEnd,
    ArrayBegin,
    ArrayEnd,
    Key(String),
    String(String),
    Integer(u64),
    /// Any number that is not an unsigned integer.
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

/// What the grammar allows next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    FirstKeyOrEnd,
    Key,
    Colon,
    FirstValueOrEnd,
    CommaOrEnd,
}

/// Outcome of scanning one token from the buffer.
enum Scan {
    Token(Token),
    Incomplete,
    Punctuation,
}

#[derive(Debug)]
pub struct Lexer {
    buf: Vec<u8>,
    pos: usize,
    stack: Vec<Frame>,
    expect: Expect,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            stack: Vec::new(),
            expect: Expect::Value,
        }
    }

    /// Append a chunk of input.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet turned into tokens.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The next complete token, or `None` until more input is fed.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] on input that is not JSON, or when more
    /// than [`MAX_PENDING`] bytes are waiting on an unfinished token.
    pub fn next_token(&mut self) -> Result<Option<Token>, ProtocolError> {
        loop {
            self.skip_whitespace();
            let Some(&byte) = self.buf.get(self.pos) else {
                return Ok(None);
            };
            match self.scan(byte)? {
                Scan::Token(token) => return Ok(Some(token)),
                Scan::Punctuation => {}
                Scan::Incomplete => {
                    if self.pending() > MAX_PENDING {
                        return Err(ProtocolError::Overflow(MAX_PENDING));
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn scan(&mut self, byte: u8) -> Result<Scan, ProtocolError> {
        match (self.expect, byte) {
            (Expect::Colon, b':') => {
                self.pos += 1;
                self.expect = Expect::Value;
                Ok(Scan::Punctuation)
            }
            (Expect::CommaOrEnd, b',') => {
                self.pos += 1;
                self.expect = match self.stack.last() {
                    Some(Frame::Object) => Expect::Key,
                    _ => Expect::Value,
                };
                Ok(Scan::Punctuation)
            }
            (Expect::CommaOrEnd | Expect::FirstKeyOrEnd, b'}')
                if self.stack.last() == Some(&Frame::Object) =>
            {
                Ok(Scan::Token(self.close(Token::ObjectEnd)))
            }
            (Expect::CommaOrEnd | Expect::FirstValueOrEnd, b']')
                if self.stack.last() == Some(&Frame::Array) =>
            {
                Ok(Scan::Token(self.close(Token::ArrayEnd)))
            }
            (Expect::FirstKeyOrEnd | Expect::Key, b'"') => Ok(match self.string()? {
                Some(key) => {
                    self.expect = Expect::Colon;
                    Scan::Token(Token::Key(key))
                }
                None => Scan::Incomplete,
            }),
            (Expect::Value | Expect::FirstValueOrEnd, _) => self.value(byte),
            _ => Err(self.unexpected(byte)),
        }
    }

    fn value(&mut self, byte: u8) -> Result<Scan, ProtocolError> {
        let token = match byte {
            b'{' => {
                self.pos += 1;
                self.stack.push(Frame::Object);
                self.expect = Expect::FirstKeyOrEnd;
                return Ok(Scan::Token(Token::ObjectBegin));
            }
            b'[' => {
                self.pos += 1;
                self.stack.push(Frame::Array);
                self.expect = Expect::FirstValueOrEnd;
                return Ok(Scan::Token(Token::ArrayBegin));
            }
            b'"' => self.string()?.map(Token::String),
            b't' => self.literal("true", Token::Bool(true))?,
            b'f' => self.literal("false", Token::Bool(false))?,
            b'n' => self.literal("null", Token::Null)?,
            b'-' | b'0'..=b'9' => self.number()?,
            _ => return Err(self.unexpected(byte)),
        };
        Ok(match token {
            Some(token) => {
                self.after_value();
                Scan::Token(token)
            }
            None => Scan::Incomplete,
        })
    }

    fn close(&mut self, token: Token) -> Token {
        self.pos += 1;
        self.stack.pop();
        self.after_value();
        token
    }

    fn after_value(&mut self) {
        self.expect = if self.stack.is_empty() {
            Expect::Value
        } else {
            Expect::CommaOrEnd
        };
    }

    /// Decode the string starting at the current quote, if it is complete.
    fn string(&mut self) -> Result<Option<String>, ProtocolError> {
        let start = self.pos;
        let mut escaped = false;
        let end = self.buf[start + 1..].iter().position(|&b| {
            let closes = b == b'"' && !escaped;
            escaped = b == b'\\' && !escaped;
            closes
        });
        let Some(end) = end.map(|offset| start + 1 + offset) else {
            return Ok(None);
        };
        let text = serde_json::from_slice(&self.buf[start..=end])
            .map_err(ProtocolError::InvalidString)?;
        self.pos = end + 1;
        Ok(Some(text))
    }

    fn literal(&mut self, word: &str, token: Token) -> Result<Option<Token>, ProtocolError> {
        let rest = &self.buf[self.pos..];
        let word = word.as_bytes();
        let len = rest.len().min(word.len());
        if rest[..len] != word[..len] {
            let byte = rest.iter().zip(word).find(|(a, b)| a != b).map_or(rest[0], |(a, _)| *a);
            return Err(ProtocolError::UnexpectedCharacter(char::from(byte)));
        }
        if len < word.len() {
            return Ok(None);
        }
        self.pos += word.len();
        Ok(Some(token))
    }

    /// A number ends at the first byte that cannot belong to it; if the
    /// buffer ends first, more digits may still be on the way.
    fn number(&mut self) -> Result<Option<Token>, ProtocolError> {
        let rest = &self.buf[self.pos..];
        let Some(len) = rest
            .iter()
            .position(|b| !matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
        else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        let number: serde_json::Number =
            serde_json::from_str(&text).map_err(|_| ProtocolError::InvalidNumber(text.clone()))?;
        let token = match number.as_u64() {
            Some(value) => Token::Integer(value),
            None => Token::Float(number.as_f64().unwrap_or(f64::NAN)),
        };
        self.pos += len;
        Ok(Some(token))
    }

    fn skip_whitespace(&mut self) {
        while self
            .buf
            .get(self.pos)
            .is_some_and(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        {
            self.pos += 1;
        }
    }

    fn unexpected(&self, byte: u8) -> ProtocolError {
        let ch = std::str::from_utf8(&self.buf[self.pos..])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::from(byte));
        ProtocolError::UnexpectedCharacter(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(lexer: &mut Lexer) -> Vec<Token> {
        let mut out = Vec::new();
        while let Some(token) = lexer.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    fn lex(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new();
        lexer.feed(input.as_bytes());
        tokens(&mut lexer)
    }

    #[test]
    fn should_tokenize_flat_object() {
        assert_eq!(
            lex(r#"{"request": "set-device", "active": true, "expire": 5}"#),
            [
                Token::ObjectBegin,
                Token::Key("request".into()),
                Token::String("set-device".into()),
                Token::Key("active".into()),
                Token::Bool(true),
                Token::Key("expire".into()),
                Token::Integer(5),
                Token::ObjectEnd,
            ]
        );
    }

    #[test]
    fn should_tokenize_nested_containers() {
        assert_eq!(
            lex(r#"{"a":[1,-2.5,null,{}],"b":{"c":false}}"#),
            [
                Token::ObjectBegin,
                Token::Key("a".into()),
                Token::ArrayBegin,
                Token::Integer(1),
                Token::Float(-2.5),
                Token::Null,
                Token::ObjectBegin,
                Token::ObjectEnd,
                Token::ArrayEnd,
                Token::Key("b".into()),
                Token::ObjectBegin,
                Token::Key("c".into()),
                Token::Bool(false),
                Token::ObjectEnd,
                Token::ObjectEnd,
            ]
        );
    }

    #[test]
    fn should_produce_same_tokens_when_fed_byte_by_byte() {
        let input = r#"{"name":"Heater \"left\"","timeout":{"value":1500,"units":"ms"},"active":false}"#;
        let mut lexer = Lexer::new();
        let mut out = Vec::new();
        for byte in input.as_bytes() {
            lexer.feed(std::slice::from_ref(byte));
            out.extend(tokens(&mut lexer));
        }
        assert_eq!(out, lex(input));
        assert_eq!(out[2], Token::String("Heater \"left\"".into()));
        assert_eq!(lexer.pending(), 0);
    }

    #[test]
    fn should_decode_string_escapes() {
        assert_eq!(
            lex(r#"["tab\tslash\\ é"]"#)[1],
            Token::String("tab\tslash\\ é".into())
        );
    }

    #[test]
    fn should_hold_number_until_terminated() {
        let mut lexer = Lexer::new();
        lexer.feed(b"[12");
        assert_eq!(tokens(&mut lexer), [Token::ArrayBegin]);
        lexer.feed(b"34]");
        assert_eq!(tokens(&mut lexer), [Token::Integer(1234), Token::ArrayEnd]);
    }

    #[test]
    fn should_accept_consecutive_top_level_objects() {
        assert_eq!(
            lex("{}\n{}"),
            [
                Token::ObjectBegin,
                Token::ObjectEnd,
                Token::ObjectBegin,
                Token::ObjectEnd
            ]
        );
    }

    #[test]
    fn should_reject_missing_colon() {
        let mut lexer = Lexer::new();
        lexer.feed(br#"{"name" "x"}"#);
        assert_eq!(lexer.next_token().unwrap(), Some(Token::ObjectBegin));
        assert_eq!(lexer.next_token().unwrap(), Some(Token::Key("name".into())));
        assert!(matches!(
            lexer.next_token(),
            Err(ProtocolError::UnexpectedCharacter('"'))
        ));
    }

    #[test]
    fn should_reject_misspelled_literal() {
        let mut lexer = Lexer::new();
        lexer.feed(b"[trve]");
        lexer.next_token().unwrap();
        assert!(matches!(
            lexer.next_token(),
            Err(ProtocolError::UnexpectedCharacter('v'))
        ));
    }

    #[test]
    fn should_reject_mismatched_closer() {
        let mut lexer = Lexer::new();
        lexer.feed(b"[}");
        lexer.next_token().unwrap();
        assert!(matches!(
            lexer.next_token(),
            Err(ProtocolError::UnexpectedCharacter('}'))
        ));
    }

    #[test]
    fn should_reject_malformed_number() {
        let mut lexer = Lexer::new();
        lexer.feed(b"[1-2]");
        lexer.next_token().unwrap();
        assert!(matches!(
            lexer.next_token(),
            Err(ProtocolError::InvalidNumber(n)) if n == "1-2"
        ));
    }

    #[test]
    fn should_reject_leading_zeros() {
        let mut lexer = Lexer::new();
        lexer.feed(b"[007]");
        lexer.next_token().unwrap();
        assert!(matches!(
            lexer.next_token(),
            Err(ProtocolError::InvalidNumber(n)) if n == "007"
        ));
    }

    #[test]
    fn should_accept_zero_and_fractions() {
        assert_eq!(
            lex("[0, 0.5]"),
            [Token::ArrayBegin, Token::Integer(0), Token::Float(0.5), Token::ArrayEnd]
        );
    }

    #[test]
    fn should_overflow_when_unfinished_token_exceeds_limit() {
        let mut lexer = Lexer::new();
        lexer.feed(b"{\"name\":\"");
        tokens(&mut lexer);
        lexer.feed(&vec![b'x'; MAX_PENDING + 1]);
        assert!(matches!(
            lexer.next_token(),
            Err(ProtocolError::Overflow(MAX_PENDING))
        ));
    }
}
