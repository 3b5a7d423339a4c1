//! `"id" = "text";` string table codec
//!
//! Tables are written as UTF-16LE with a byte order mark, one entry per line,
//! sorted by id so identical input produces identical bytes. Reading accepts
//! UTF-16 (either byte order, BOM required) and UTF-8, and skips blank lines
//! and `/* */` / `//` comments.

use std::collections::HashMap;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use thiserror::Error;

use crate::error::{
    LocalizationError,
    StorageError,
    StorageOperation,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct StringsParseError {
    pub line: usize,
    pub message: String,
}

/// Key/text pairs of one table file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: HashMap<String, String>,
}

impl StringTable {
    #[must_use]
    pub const fn new(strings: HashMap<String, String>) -> Self {
        Self { strings }
    }

    /// Reads and parses a table file.
    ///
    /// # Errors
    /// - [`LocalizationError::Storage`] when the file cannot be read
    /// - [`LocalizationError::MalformedTable`] when its content does not parse
    pub fn load(path: &Path) -> Result<Self, LocalizationError> {
        let bytes = std::fs::read(path)
            .map_err(|e| StorageError::new(StorageOperation::ReadTable, path, e))?;
        let text = decode(&bytes);
        let strings = parse(&text).map_err(|e| LocalizationError::MalformedTable {
            path: path.to_path_buf(),
            line: e.line,
            message: e.message,
        })?;
        Ok(Self { strings })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    #[must_use]
    pub const fn strings(&self) -> &HashMap<String, String> {
        &self.strings
    }

    #[must_use]
    pub fn into_strings(self) -> HashMap<String, String> {
        self.strings
    }
}

/// Serializes entries as `"id" = "text";` lines, sorted by id.
#[must_use]
pub fn serialize(strings: &HashMap<String, String>) -> String {
    let mut ids: Vec<&String> = strings.keys().collect();
    ids.sort();

    let mut out = String::new();
    for id in ids {
        let Some(text) = strings.get(id) else {
            continue;
        };
        out.push('"');
        escape_into(id, &mut out);
        out.push_str("\" = \"");
        escape_into(text, &mut out);
        out.push_str("\";\n");
    }
    out
}

/// UTF-16LE bytes with a leading byte order mark.
#[must_use]
pub fn encode_utf16(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Decodes table bytes, honoring a BOM and defaulting to UTF-8 or UTF-16LE.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = encoding_rs::Encoding::for_bom(bytes) {
        let body = bytes.get(bom_length..).unwrap_or_default();
        return encoding.decode_without_bom_handling(body).0.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => encoding_rs::UTF_16LE.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
}

/// Parses table text. Later duplicates of an id replace earlier ones.
///
/// # Errors
/// [`StringsParseError`] with the 1-based line of the first syntax error.
pub fn parse(text: &str) -> Result<HashMap<String, String>, StringsParseError> {
    let mut parser = Parser { chars: text.chars().peekable(), line: 1 };
    let mut strings = HashMap::new();

    loop {
        parser.skip_trivia()?;
        if parser.chars.peek().is_none() {
            break;
        }
        let key = parser.quoted()?;
        parser.skip_trivia()?;
        parser.expect('=')?;
        parser.skip_trivia()?;
        let value = parser.quoted()?;
        parser.skip_trivia()?;
        parser.expect(';')?;
        strings.insert(key, value);
    }

    Ok(strings)
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> StringsParseError {
        StringsParseError { line: self.line, message: message.into() }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), StringsParseError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    /// Whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), StringsParseError> {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c != '/' {
                break;
            }
            self.bump();
            match self.bump() {
                Some('/') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('*') => {
                    let mut previous = '\0';
                    loop {
                        let Some(c) = self.bump() else {
                            return Err(self.error("unterminated comment"));
                        };
                        if previous == '*' && c == '/' {
                            break;
                        }
                        previous = c;
                    }
                }
                _ => return Err(self.error("stray '/'")),
            }
        }
        Ok(())
    }

    fn quoted(&mut self) -> Result<String, StringsParseError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn escape(&mut self) -> Result<char, StringsParseError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('0') => Ok('\0'),
            Some('u' | 'U') => {
                let unit = self.hex4()?;
                let code = match unit {
                    0xD800..=0xDBFF => {
                        // surrogate pair written as two escapes
                        self.expect('\\')?;
                        match self.bump() {
                            Some('u' | 'U') => {}
                            _ => return Err(self.error("unpaired surrogate in unicode escape")),
                        }
                        let low = self.hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(self.error("unpaired surrogate in unicode escape"));
                        }
                        0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                    }
                    _ => unit,
                };
                char::from_u32(code).ok_or_else(|| self.error("invalid unicode scalar"))
            }
            Some(c) => Ok(c),
            None => Err(self.error("unterminated escape")),
        }
    }

    /// Four hex digits of a `\u` escape.
    fn hex4(&mut self) -> Result<u32, StringsParseError> {
        let mut code = 0_u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }
}
