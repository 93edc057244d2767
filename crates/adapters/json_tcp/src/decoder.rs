//! Depth-tracked request decoder.
//!
//! Folds the token stream of one connection into [`RawRequest`]s, one per
//! top-level object. Only the keys the protocol knows are accepted, at the
//! depth they belong to; anything else poisons the decoder for good.

use crate::error::ProtocolError;
use crate::lexer::{Lexer, Token};

/// A `{"value": .., "units": ..}` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quantity {
    pub value: Option<u64>,
    pub units: Option<String>,
}

/// The fields of one request object, not yet validated against its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    pub request: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
    /// Override duration in seconds.
    pub expire: Option<u64>,
    pub timeout: Option<Quantity>,
    /// Accepted so a client can echo a sensor entry back; never used.
    pub reading: Option<Quantity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Request,
    Name,
    Active,
    Expire,
    Timeout,
    Reading,
    Value,
    Units,
}

impl Key {
    fn top(name: &str) -> Option<Self> {
        Some(match name {
            "request" => Self::Request,
            "name" => Self::Name,
            "active" => Self::Active,
            "expire" => Self::Expire,
            "timeout" => Self::Timeout,
            "reading" => Self::Reading,
            _ => return None,
        })
    }

    fn nested(name: &str) -> Option<Self> {
        Some(match name {
            "value" => Self::Value,
            "units" => Self::Units,
            _ => return None,
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Name => "name",
            Self::Active => "active",
            Self::Expire => "expire",
            Self::Timeout => "timeout",
            Self::Reading => "reading",
            Self::Value => "value",
            Self::Units => "units",
        }
    }

    const fn expected(self) -> &'static str {
        match self {
            Self::Request | Self::Name | Self::Units => "a string",
            Self::Active => "a boolean",
            Self::Expire | Self::Value => "an unsigned integer",
            Self::Timeout | Self::Reading => "an object",
        }
    }
}

#[derive(Debug, Default)]
pub struct Decoder {
    lexer: Lexer,
    depth: usize,
    key: Option<Key>,
    /// Key of the object being filled at depth 2.
    parent: Option<Key>,
    quantity: Quantity,
    current: RawRequest,
    poisoned: bool,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.lexer.feed(bytes);
    }

    /// Whether a request has started but not ended yet.
    #[must_use]
    pub fn in_request(&self) -> bool {
        self.depth > 0
    }

    /// The next complete request, or `None` until more input is fed.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProtocolError`] met, then
    /// [`ProtocolError::Poisoned`] on every later call.
    pub fn next_request(&mut self) -> Result<Option<RawRequest>, ProtocolError> {
        if self.poisoned {
            return Err(ProtocolError::Poisoned);
        }
        let result = self.advance();
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<RawRequest>, ProtocolError> {
        while let Some(token) = self.lexer.next_token()? {
            if let Some(request) = self.accept(token)? {
                return Ok(Some(request));
            }
        }
        Ok(None)
    }

    fn accept(&mut self, token: Token) -> Result<Option<RawRequest>, ProtocolError> {
        match (self.depth, token) {
            (0, Token::ObjectBegin) => {
                self.depth = 1;
                self.current = RawRequest::default();
            }
            (0, _) => return Err(ProtocolError::NotAnObject),
            (1, Token::ObjectEnd) => {
                self.depth = 0;
                return Ok(Some(std::mem::take(&mut self.current)));
            }
            (1, Token::ObjectBegin) => {
                let key = self.take_key()?;
                if !matches!(key, Key::Timeout | Key::Reading) {
                    return Err(Self::mismatch(key));
                }
                self.depth = 2;
                self.parent = Some(key);
                self.quantity = Quantity::default();
            }
            (2, Token::ObjectEnd) => {
                let quantity = std::mem::take(&mut self.quantity);
                match self.parent.take() {
                    Some(Key::Timeout) => self.current.timeout = Some(quantity),
                    _ => self.current.reading = Some(quantity),
                }
                self.depth = 1;
            }
            (1, Token::Key(name)) => {
                self.key = Some(Key::top(&name).ok_or(ProtocolError::UnknownKey(name))?);
            }
            (2, Token::Key(name)) => {
                self.key = Some(Key::nested(&name).ok_or(ProtocolError::UnknownKey(name))?);
            }
            (_, Token::ObjectBegin | Token::ArrayBegin | Token::ArrayEnd) => {
                return Err(ProtocolError::UnexpectedNesting);
            }
            (_, scalar) => self.scalar(scalar)?,
        }
        Ok(None)
    }

    fn scalar(&mut self, token: Token) -> Result<(), ProtocolError> {
        let key = self.take_key()?;
        match (key, token) {
            (Key::Request, Token::String(s)) => self.current.request = Some(s),
            (Key::Name, Token::String(s)) => self.current.name = Some(s),
            (Key::Active, Token::Bool(b)) => self.current.active = Some(b),
            (Key::Expire, Token::Integer(n)) => self.current.expire = Some(n),
            (Key::Value, Token::Integer(n)) => self.quantity.value = Some(n),
            (Key::Units, Token::String(s)) => self.quantity.units = Some(s),
            (key, _) => return Err(Self::mismatch(key)),
        }
        Ok(())
    }

    fn take_key(&mut self) -> Result<Key, ProtocolError> {
        self.key.take().ok_or(ProtocolError::UnexpectedNesting)
    }

    fn mismatch(key: Key) -> ProtocolError {
        ProtocolError::TypeMismatch {
            key: key.name(),
            expected: key.expected(),
        }
    }
}
