//! Reader: source text to forms.
//!
//! The reader pulls bytes from a [`BufRead`] one at a time and never consumes
//! past the end of the form it returns, so the stream position after each
//! [`Reader::read`] is exactly the end of that form.

use std::io::{BufRead, ErrorKind};

use crate::error::{ReadError, ReadErrorKind};
use crate::form::{Form, Symbol};
use crate::list::List;
use crate::vector::Vector;

/// Deepest nesting of lists, vectors and quotes the reader accepts.
pub const MAX_DEPTH: usize = 256;

pub struct Reader<R> {
    input: R,
    position: usize,
    depth: usize,
    /// First error met; the stream is abandoned after it.
    failed: Option<ReadError>,
}

fn is_space(c: u8) -> bool {
    c.is_ascii_whitespace() || c == b','
}

pub fn is_symbol_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"*+!-_?/=<>.".contains(&c)
}

fn is_delimiter(c: u8) -> bool {
    is_space(c) || b"()[]\"'".contains(&c)
}

impl<'a> Reader<&'a [u8]> {
    pub fn from_string(source: &'a str) -> Self {
        Reader::new(source.as_bytes())
    }
}

impl<R: BufRead> Reader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            position: 0,
            depth: 0,
            failed: None,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    /// Reads the next top-level form. `Ok(None)` means the input holds no more forms.
    ///
    /// After an error the reader is left where the error was found and keeps
    /// returning that error.
    pub fn read(&mut self) -> Result<Option<Form>, ReadError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let result = match self.skip_space() {
            Ok(Some(c)) => {
                let start = self.position;
                self.read_form(c).map(|form| {
                    log::trace!(target: "reader", "read {} at byte {}", form, start);
                    Some(form)
                })
            }
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            log::debug!(target: "reader", "{}", err);
            self.failed = Some(err.clone());
        }

        result
    }

    fn peek(&mut self) -> Result<Option<u8>, ReadError> {
        loop {
            match self.input.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(ReadError::new(
                        ReadErrorKind::Io(err.kind()),
                        err.to_string(),
                        self.position,
                    ))
                }
            }
        }
    }

    fn bump(&mut self) {
        self.input.consume(1);
        self.position += 1;
    }

    fn next_byte(&mut self) -> Result<Option<u8>, ReadError> {
        let c = self.peek()?;
        if c.is_some() {
            self.bump();
        }
        Ok(c)
    }

    /// Skips insignificant bytes and returns the next one without consuming it.
    fn skip_space(&mut self) -> Result<Option<u8>, ReadError> {
        while let Some(c) = self.peek()? {
            if !is_space(c) {
                return Ok(Some(c));
            }
            self.bump();
        }
        Ok(None)
    }

    /// Reads a form whose first byte `c` has been peeked.
    fn read_form(&mut self, c: u8) -> Result<Form, ReadError> {
        match c {
            b'(' => self.nested(c, |reader| {
                let items = reader.read_compound(b'(', b')')?;
                Ok(Form::List(List::from(items)))
            }),
            b'[' => self.nested(c, |reader| {
                let items = reader.read_compound(b'[', b']')?;
                Ok(Form::Vector(Vector::from(items)))
            }),
            b'\'' => self.nested(c, |reader| match reader.skip_space()? {
                Some(c) => {
                    let quoted = reader.read_form(c)?;
                    Ok(Form::list(vec![Form::symbol("quote"), quoted]))
                }
                None => Err(ReadError::new(
                    ReadErrorKind::UnexpectedEof,
                    "'",
                    reader.position,
                )),
            }),
            b'"' => self.read_string(),
            _ => self.read_atom(c),
        }
    }

    /// Consumes the opening byte `open` and runs `read` one level deeper.
    fn nested(
        &mut self,
        open: u8,
        read: impl FnOnce(&mut Self) -> Result<Form, ReadError>,
    ) -> Result<Form, ReadError> {
        if self.depth >= MAX_DEPTH {
            return Err(ReadError::new(
                ReadErrorKind::TooDeep,
                (open as char).to_string(),
                self.position,
            ));
        }
        self.bump();
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    fn read_compound(&mut self, open: u8, close: u8) -> Result<Vec<Form>, ReadError> {
        let mut items = Vec::new();

        loop {
            match self.skip_space()? {
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(c) => items.push(self.read_form(c)?),
                None => {
                    return Err(ReadError::new(
                        ReadErrorKind::UnexpectedEof,
                        (open as char).to_string(),
                        self.position,
                    ))
                }
            }
        }
    }

    fn read_atom(&mut self, c: u8) -> Result<Form, ReadError> {
        let start = self.position;

        if c == b'+' || c == b'-' {
            self.bump();
            return match self.peek()? {
                Some(d) if d.is_ascii_digit() => self.read_integer(vec![c], start),
                _ => self.read_symbol(vec![c], start),
            };
        }

        if c.is_ascii_digit() {
            return self.read_integer(Vec::new(), start);
        }

        if is_symbol_char(c) {
            return self.read_symbol(Vec::new(), start);
        }

        let fragment = self.take_token(Vec::new())?;
        Err(ReadError::new(ReadErrorKind::BadSymbolStart, fragment, start))
    }

    /// Consumes the rest of a token for error reporting.
    fn take_token(&mut self, mut bytes: Vec<u8>) -> Result<String, ReadError> {
        if bytes.is_empty() {
            if let Some(c) = self.next_byte()? {
                bytes.push(c);
            }
        }
        while let Some(c) = self.peek()? {
            if is_delimiter(c) {
                break;
            }
            bytes.push(c);
            self.bump();
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_integer(&mut self, mut digits: Vec<u8>, start: usize) -> Result<Form, ReadError> {
        while let Some(c) = self.peek()? {
            if !c.is_ascii_digit() {
                if is_delimiter(c) {
                    break;
                }
                let fragment = self.take_token(digits)?;
                return Err(ReadError::new(ReadErrorKind::InvalidInteger, fragment, start));
            }
            digits.push(c);
            self.bump();
        }

        let text = String::from_utf8_lossy(&digits).into_owned();
        text.parse::<i64>()
            .map(Form::Integer)
            .map_err(|_| ReadError::new(ReadErrorKind::InvalidInteger, text, start))
    }

    fn read_symbol(&mut self, mut bytes: Vec<u8>, start: usize) -> Result<Form, ReadError> {
        while let Some(c) = self.peek()? {
            if !is_symbol_char(c) {
                break;
            }
            bytes.push(c);
            self.bump();
        }

        // Symbol characters are all ASCII.
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if text == "/" {
            return Ok(Form::Symbol(Symbol::new("/")));
        }

        let mut parts = text.split('/');
        let symbol = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, _) => Symbol::new(name),
            (Some(ns), Some(name), None) if !name.is_empty() => Symbol::qualified(ns, name),
            _ => {
                return Err(ReadError::new(
                    ReadErrorKind::MalformedNamespace,
                    text,
                    start,
                ))
            }
        };

        if symbol.namespace().is_none() {
            match symbol.name() {
                "true" => return Ok(Form::Boolean(true)),
                "false" => return Ok(Form::Boolean(false)),
                "nil" => return Ok(Form::Nil),
                _ => {}
            }
        }

        Ok(Form::Symbol(symbol))
    }

    fn read_string(&mut self) -> Result<Form, ReadError> {
        let start = self.position;
        self.bump();

        let mut bytes = Vec::new();

        loop {
            match self.next_byte()? {
                Some(b'"') => break,
                Some(b'\\') => match self.next_byte()? {
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(c) => bytes.push(c),
                    None => return Err(self.unterminated(&bytes, start)),
                },
                Some(c) => bytes.push(c),
                None => return Err(self.unterminated(&bytes, start)),
            }
        }

        match String::from_utf8(bytes) {
            Ok(s) => Ok(Form::String(s.into())),
            Err(err) => Err(ReadError::new(
                ReadErrorKind::InvalidUtf8,
                String::from_utf8_lossy(err.as_bytes()).into_owned(),
                start,
            )),
        }
    }

    fn unterminated(&self, bytes: &[u8], start: usize) -> ReadError {
        ReadError::new(
            ReadErrorKind::UnterminatedString,
            format!("\"{}", String::from_utf8_lossy(bytes)),
            start,
        )
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Form, ReadError>;

    /// Yields forms until the input ends. A read error is yielded once and ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed.is_some() {
            return None;
        }
        self.read().transpose()
    }
}

/// Reads every form in `source`.
pub fn read_all(source: &str) -> Result<Vec<Form>, ReadError> {
    Reader::from_string(source).collect()
}
