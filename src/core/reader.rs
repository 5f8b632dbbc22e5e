//! Pull reader for XML text
//!
//! `XmlEventReader` scans one markup token at a time and turns it into
//! [`SourceEvent`]s with namespaces resolved and entities decoded. It owns its
//! input, so a lazily built DTM can keep it alive for as long as it needs to
//! pull more nodes.
//!
//! In lenient mode broken markup is recovered the way a browser would: a stray
//! '<' becomes text, a mismatched end tag closes the innermost element, and
//! anything still open at end of input is closed. Strict mode reports each of
//! these as `DtmError::Malformed` at the byte offset of the offending token.

use std::collections::VecDeque;

use tracing::trace;

use super::entities::{decode_text, decode_text_strict};
use super::namespace::NamespaceResolver;
use super::scanner::{is_name_start_char, is_whitespace, split_qname, Scanner};
use crate::error::DtmError;
use crate::sax::{Attribute, ContentHandler, EventSource, NamespaceDecl, QName, SourceEvent};

/// One lexical unit of markup, positions are byte offsets into the input
#[derive(Debug)]
enum Token {
    Eof,
    Text {
        start: usize,
        raw: String,
    },
    StartTag {
        start: usize,
        name: String,
        attributes: Vec<(String, String)>,
        empty: bool,
    },
    EndTag {
        start: usize,
        name: String,
    },
    Comment(String),
    CData {
        start: usize,
        text: String,
    },
    ProcessingInstruction {
        target: String,
        data: String,
    },
    /// XML declaration, DOCTYPE, or markup dropped during recovery
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Start,
    Content,
    Finished,
}

/// Pull parser producing construction events from XML text
#[derive(Debug)]
pub struct XmlEventReader {
    input: String,
    pos: usize,
    strict: bool,
    state: ReaderState,
    queue: VecDeque<SourceEvent>,
    open: Vec<QName>,
    resolver: NamespaceResolver,
    root_seen: bool,
    root_closed: bool,
}

impl XmlEventReader {
    pub fn new(input: impl Into<String>) -> Self {
        XmlEventReader {
            input: input.into(),
            pos: 0,
            strict: false,
            state: ReaderState::Start,
            queue: VecDeque::with_capacity(4),
            open: Vec::with_capacity(32),
            resolver: NamespaceResolver::new(),
            root_seen: false,
            root_closed: false,
        }
    }

    /// Report malformed input instead of recovering from it
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Byte offset of the next unread token
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Push every remaining event into `handler`
    pub fn drive<H: ContentHandler + ?Sized>(&mut self, handler: &mut H) -> Result<(), DtmError> {
        while let Some(event) = self.next_event()? {
            event.dispatch(handler)?;
        }
        Ok(())
    }

    fn malformed(&self, position: usize, message: impl Into<String>) -> DtmError {
        DtmError::malformed(position, message)
    }

    fn read_token(&self) -> Result<(Token, usize), DtmError> {
        let scanner = Scanner::at(self.input.as_bytes(), self.pos);
        let start = scanner.position();
        match scanner.peek() {
            None => Ok((Token::Eof, start)),
            Some(b'<') => self.read_markup(scanner),
            Some(_) => {
                let end = scanner.find_byte(b'<').unwrap_or(scanner.len());
                let raw = self.input[start..end].to_string();
                Ok((Token::Text { start, raw }, end))
            }
        }
    }

    fn read_markup(&self, mut scanner: Scanner<'_>) -> Result<(Token, usize), DtmError> {
        let start = scanner.position();
        scanner.advance(1);

        match scanner.peek() {
            Some(b'/') => {
                scanner.advance(1);
                scanner.skip_whitespace();
                let Some(name) = scanner.read_name() else {
                    return self.recover(scanner, start, "expected a name in end tag");
                };
                let name = String::from_utf8_lossy(name).into_owned();
                scanner.skip_whitespace();
                if scanner.peek() != Some(b'>') {
                    return self.recover(scanner, start, "expected '>' to close end tag");
                }
                Ok((Token::EndTag { start, name }, scanner.position() + 1))
            }
            Some(b'!') => {
                scanner.advance(1);
                if scanner.starts_with(b"--") {
                    scanner.advance(2);
                    let (text, next) = self.read_until(&scanner, b"-->", start, "unterminated comment")?;
                    Ok((Token::Comment(text), next))
                } else if scanner.starts_with(b"[CDATA[") {
                    scanner.advance(7);
                    let (text, next) = self.read_until(&scanner, b"]]>", start, "unterminated CDATA section")?;
                    Ok((Token::CData { start, text }, next))
                } else if scanner.starts_with(b"DOCTYPE") || scanner.starts_with(b"doctype") {
                    self.skip_doctype(scanner, start)
                } else {
                    self.recover(scanner, start, "unknown markup declaration")
                }
            }
            Some(b'?') => {
                scanner.advance(1);
                let Some(target) = scanner.read_name() else {
                    return self.recover(scanner, start, "expected a processing instruction target");
                };
                let target = String::from_utf8_lossy(target).into_owned();
                scanner.skip_whitespace();
                let (data, next) = self.read_until(&scanner, b"?>", start, "unterminated processing instruction")?;
                if target.eq_ignore_ascii_case("xml") {
                    return Ok((Token::Skip, next));
                }
                Ok((Token::ProcessingInstruction { target, data }, next))
            }
            Some(c) if is_name_start_char(c) => self.read_start_tag(scanner, start),
            _ => {
                if self.strict {
                    return Err(self.malformed(start, "'<' does not start valid markup"));
                }
                Ok((
                    Token::Text {
                        start,
                        raw: "<".to_string(),
                    },
                    start + 1,
                ))
            }
        }
    }

    fn read_start_tag(&self, mut scanner: Scanner<'_>, start: usize) -> Result<(Token, usize), DtmError> {
        let name = match scanner.read_name() {
            Some(name) => String::from_utf8_lossy(name).into_owned(),
            None => return self.recover(scanner, start, "expected an element name"),
        };
        let mut attributes = Vec::new();

        loop {
            scanner.skip_whitespace();
            match scanner.peek() {
                Some(b'>') => {
                    let token = Token::StartTag { start, name, attributes, empty: false };
                    return Ok((token, scanner.position() + 1));
                }
                Some(b'/') if scanner.peek_at(1) == Some(b'>') => {
                    let token = Token::StartTag { start, name, attributes, empty: true };
                    return Ok((token, scanner.position() + 2));
                }
                Some(c) if is_name_start_char(c) => {
                    let attr_start = scanner.position();
                    match self.read_attribute(&mut scanner) {
                        Some(attribute) => attributes.push(attribute),
                        None if self.strict => {
                            return Err(self.malformed(attr_start, format!("malformed attribute in <{name}>")));
                        }
                        None => {}
                    }
                }
                Some(_) if self.strict => {
                    return Err(self.malformed(scanner.position(), format!("unexpected character in <{name}>")));
                }
                Some(_) => scanner.advance(1),
                None if self.strict => {
                    return Err(self.malformed(start, format!("unterminated start tag <{name}>")));
                }
                None => {
                    let token = Token::StartTag { start, name, attributes, empty: false };
                    return Ok((token, scanner.len()));
                }
            }
        }
    }

    fn read_attribute(&self, scanner: &mut Scanner<'_>) -> Option<(String, String)> {
        let name = String::from_utf8_lossy(scanner.read_name()?).into_owned();
        scanner.skip_whitespace();
        if scanner.peek() != Some(b'=') {
            return None;
        }
        scanner.advance(1);
        scanner.skip_whitespace();
        let quote = scanner.peek().filter(|q| matches!(q, b'"' | b'\''))?;
        scanner.advance(1);
        let value_start = scanner.position();
        let value_end = scanner.find_byte(quote)?;
        scanner.set_position(value_end + 1);
        Some((name, self.input[value_start..value_end].to_string()))
    }

    fn read_until(
        &self,
        scanner: &Scanner<'_>,
        terminator: &[u8],
        start: usize,
        message: &'static str,
    ) -> Result<(String, usize), DtmError> {
        let from = scanner.position();
        match scanner.find_seq(terminator) {
            Some(end) => Ok((self.input[from..end].to_string(), end + terminator.len())),
            None if self.strict => Err(self.malformed(start, message)),
            None => Ok((self.input[from..].to_string(), scanner.len())),
        }
    }

    fn skip_doctype(&self, mut scanner: Scanner<'_>, start: usize) -> Result<(Token, usize), DtmError> {
        let mut depth = 0usize;
        while let Some(c) = scanner.peek() {
            match c {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return Ok((Token::Skip, scanner.position() + 1)),
                _ => {}
            }
            scanner.advance(1);
        }
        if self.strict {
            return Err(self.malformed(start, "unterminated DOCTYPE"));
        }
        Ok((Token::Skip, scanner.len()))
    }

    /// Skip a broken tag in lenient mode, fail in strict mode
    fn recover(&self, scanner: Scanner<'_>, start: usize, message: &'static str) -> Result<(Token, usize), DtmError> {
        if self.strict {
            return Err(self.malformed(start, message));
        }
        let next = scanner.find_tag_end_quoted().map_or(scanner.len(), |end| end + 1);
        Ok((Token::Skip, next))
    }

    fn decode(&self, raw: &str, start: usize) -> Result<String, DtmError> {
        if self.strict {
            decode_text_strict(raw)
                .map(|text| text.into_owned())
                .map_err(|(offset, message)| self.malformed(start + offset, message))
        } else {
            Ok(decode_text(raw).into_owned())
        }
    }

    fn apply(&mut self, token: Token) -> Result<(), DtmError> {
        match token {
            Token::Eof => self.finish(),
            Token::Skip => Ok(()),
            Token::Text { start, raw } => {
                if self.open.is_empty() {
                    if is_whitespace(&raw) {
                        return Ok(());
                    }
                    if self.strict {
                        return Err(self.malformed(start, "text outside the root element"));
                    }
                }
                let text = self.decode(&raw, start)?;
                if !text.is_empty() {
                    self.queue.push_back(SourceEvent::Characters(text));
                }
                Ok(())
            }
            Token::CData { start, text } => {
                if self.open.is_empty() && self.strict {
                    return Err(self.malformed(start, "CDATA outside the root element"));
                }
                self.queue.push_back(SourceEvent::CData(text));
                Ok(())
            }
            Token::Comment(text) => {
                self.queue.push_back(SourceEvent::Comment(text));
                Ok(())
            }
            Token::ProcessingInstruction { target, data } => {
                self.queue.push_back(SourceEvent::ProcessingInstruction { target, data });
                Ok(())
            }
            Token::StartTag {
                start,
                name,
                attributes,
                empty,
            } => self.start_element(start, &name, attributes, empty),
            Token::EndTag { start, name } => self.end_element(start, &name),
        }
    }

    fn start_element(
        &mut self,
        start: usize,
        raw_name: &str,
        raw_attributes: Vec<(String, String)>,
        empty: bool,
    ) -> Result<(), DtmError> {
        if self.strict && self.root_closed {
            return Err(self.malformed(start, format!("<{raw_name}> after the root element")));
        }

        self.resolver.push_scope();
        let mut namespaces = Vec::new();
        let mut plain = Vec::with_capacity(raw_attributes.len());
        for (name, raw_value) in raw_attributes {
            let value = self.decode(&raw_value, start)?;
            if name == "xmlns" {
                namespaces.push(NamespaceDecl::new("", value));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                if self.strict && value.is_empty() {
                    return Err(self.malformed(start, format!("prefix '{prefix}' cannot be undeclared")));
                }
                namespaces.push(NamespaceDecl::new(prefix, value));
            } else {
                plain.push((name, value));
            }
        }
        for decl in &namespaces {
            self.resolver.declare(&decl.prefix, &decl.uri);
        }

        let name = self.qualify(start, raw_name, true)?;
        let mut attributes: Vec<Attribute> = Vec::with_capacity(plain.len());
        for (raw, value) in plain {
            let attr_name = self.qualify(start, &raw, false)?;
            let duplicate = attributes.iter().any(|a| {
                a.name.local == attr_name.local && a.name.namespace == attr_name.namespace
            });
            if duplicate {
                if self.strict {
                    return Err(self.malformed(start, format!("duplicate attribute '{raw}' in <{raw_name}>")));
                }
                continue;
            }
            attributes.push(Attribute::new(attr_name, value));
        }

        trace!(element = raw_name, attributes = attributes.len(), "start tag");
        self.root_seen = true;
        self.queue.push_back(SourceEvent::StartElement {
            name: name.clone(),
            namespaces,
            attributes,
        });
        if empty {
            self.queue.push_back(SourceEvent::EndElement { name });
            self.resolver.pop_scope();
            self.root_closed |= self.open.is_empty();
        } else {
            self.open.push(name);
        }
        Ok(())
    }

    /// Resolve a raw `prefix:local` name; unprefixed attributes take no namespace
    fn qualify(&self, start: usize, raw: &str, element: bool) -> Result<QName, DtmError> {
        let (prefix, local) = split_qname(raw);
        if prefix.is_empty() && !element {
            return Ok(QName::local(local));
        }
        match self.resolver.resolve(prefix) {
            Some(uri) => Ok(QName::new(uri, prefix, local)),
            None if self.strict => Err(self.malformed(start, format!("unbound prefix '{prefix}'"))),
            None => Ok(QName::new("", prefix, local)),
        }
    }

    fn end_element(&mut self, start: usize, raw_name: &str) -> Result<(), DtmError> {
        let Some(top) = self.open.last() else {
            if self.strict {
                return Err(self.malformed(start, format!("unexpected end tag </{raw_name}>")));
            }
            return Ok(());
        };
        if top.qualified() != raw_name && self.strict {
            return Err(self.malformed(
                start,
                format!("Tag mismatch: <{}> closed with </{raw_name}>", top.qualified()),
            ));
        }
        self.close_innermost();
        Ok(())
    }

    fn close_innermost(&mut self) {
        if let Some(name) = self.open.pop() {
            self.resolver.pop_scope();
            self.queue.push_back(SourceEvent::EndElement { name });
            self.root_closed |= self.open.is_empty();
        }
    }

    fn finish(&mut self) -> Result<(), DtmError> {
        if self.strict {
            if let Some(open) = self.open.last() {
                return Err(self.malformed(self.pos, format!("unclosed element <{}>", open.qualified())));
            }
            if !self.root_seen {
                return Err(self.malformed(self.pos, "no root element"));
            }
        }
        while !self.open.is_empty() {
            self.close_innermost();
        }
        self.queue.push_back(SourceEvent::EndDocument);
        self.state = ReaderState::Finished;
        Ok(())
    }
}

impl EventSource for XmlEventReader {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, DtmError> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(Some(event));
            }
            match self.state {
                ReaderState::Finished => return Ok(None),
                ReaderState::Start => {
                    if self.input.starts_with('\u{feff}') {
                        self.pos = '\u{feff}'.len_utf8();
                    }
                    self.queue.push_back(SourceEvent::StartDocument);
                    self.state = ReaderState::Content;
                }
                ReaderState::Content => {
                    let (token, next) = self.read_token()?;
                    self.pos = next;
                    self.apply(token)?;
                }
            }
        }
    }
}
