//! Line splitting shared by both file formats.

use std::iter::Peekable;
use std::vec;

use crate::error::{ConfigError, SyntaxError};

/// Longest accepted line, terminator excluded.
pub const MAX_LINE: usize = 1024;

/// A non-empty line with its comment removed.
pub struct Line<'a> {
    pub number: usize,
    tokens: Peekable<vec::IntoIter<&'a str>>,
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | ',' | '\r')
}

impl<'a> Line<'a> {
    fn new(number: usize, text: &'a str) -> Self {
        let tokens: Vec<&str> = text
            .split(is_separator)
            .filter(|token| !token.is_empty())
            .collect();
        Self {
            number,
            tokens: tokens.into_iter().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }

    pub fn has_more(&mut self) -> bool {
        self.tokens.peek().is_some()
    }

    /// Every token not consumed yet.
    pub fn rest(self) -> Vec<&'a str> {
        self.tokens.collect()
    }
}

/// Iterate the meaningful lines of `text`, skipping blanks and comments.
///
/// # Errors
///
/// Fails on the first line longer than [`MAX_LINE`].
pub fn lines<'a>(
    file: &'a str,
    text: &'a str,
) -> impl Iterator<Item = Result<Line<'a>, ConfigError>> + 'a {
    text.lines().enumerate().filter_map(move |(index, raw)| {
        let number = index + 1;
        if raw.len() > MAX_LINE {
            return Some(Err(ConfigError::syntax(
                file,
                number,
                SyntaxError::LineTooLong(MAX_LINE),
            )));
        }
        let content = raw.split_once('#').map_or(raw, |(before, _)| before);
        let mut line = Line::new(number, content);
        line.has_more().then_some(Ok(line))
    })
}
