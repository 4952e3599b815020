//! In-place tokenizer: turns markup bytes into tree entities.
//!
//! The tokenizer is deliberately thin: it only ever talks to the tree through
//! entity creation and the string store. Names and values that need no
//! decoding borrow directly from the document-owned input buffer; anything
//! that requires entity expansion or newline normalization is copied into
//! the arena.

use std::borrow::Cow;

use bitflags::bitflags;
use memchr::{memchr, memmem};

use crate::document::{Encoding, ParseResult, ParseStatus};
use crate::mem::Allocator;
use crate::tree::{self, NodeData, NodeKind, RawStr};

bitflags! {
    /// Parsing options, combinable with `|`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ParseOptions: u32 {
        /// Add processing instructions to the tree.
        const PI = 0x0001;
        /// Add comments to the tree.
        const COMMENTS = 0x0002;
        /// Add CDATA sections to the tree.
        const CDATA = 0x0004;
        /// Keep text nodes that consist only of whitespace.
        const WS_PCDATA = 0x0008;
        /// Expand character and entity references.
        const ESCAPES = 0x0010;
        /// Normalize line endings to `\n`.
        const EOL = 0x0020;
        /// Normalize whitespace inside attribute values to spaces.
        const WCONV_ATTRIBUTE = 0x0040;
        /// Add the document declaration to the tree.
        const DECLARATION = 0x0100;
        /// Add the document type declaration to the tree.
        const DOCTYPE = 0x0200;
    }
}

impl ParseOptions {
    /// Minimal mode: only elements and non-whitespace text reach the tree,
    /// with no text conversions.
    pub const MINIMAL: ParseOptions = ParseOptions::empty();

    /// Default mode: CDATA sections, escape expansion, newline and
    /// attribute-value normalization.
    pub const DEFAULT: ParseOptions = ParseOptions::CDATA
        .union(ParseOptions::ESCAPES)
        .union(ParseOptions::WCONV_ATTRIBUTE)
        .union(ParseOptions::EOL);

    /// Full mode: every node kind reaches the tree.
    pub const FULL: ParseOptions = ParseOptions::DEFAULT
        .union(ParseOptions::PI)
        .union(ParseOptions::COMMENTS)
        .union(ParseOptions::DECLARATION)
        .union(ParseOptions::DOCTYPE);
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions::DEFAULT
    }
}

type PResult<T> = Result<T, (ParseStatus, usize)>;

/// Parses `buf` (already validated as UTF-8) into children of `root`.
pub(crate) fn parse_document(
    root: *mut NodeData,
    buf: &[u8],
    options: ParseOptions,
    alloc: *mut Allocator,
) -> ParseResult {
    let mut parser = Parser {
        buf,
        pos: 0,
        options,
        alloc,
    };

    if buf.starts_with(b"\xEF\xBB\xBF") {
        parser.pos = 3;
    }

    match parser.run(root) {
        Ok(()) => ParseResult {
            status: ParseStatus::Ok,
            offset: parser.pos,
            encoding: Encoding::Utf8,
        },
        Err((status, offset)) => ParseResult {
            status,
            offset,
            encoding: Encoding::Utf8,
        },
    }
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.') || c >= 0x80
}

struct Parser<'b> {
    buf: &'b [u8],
    pos: usize,
    options: ParseOptions,
    alloc: *mut Allocator,
}

impl<'b> Parser<'b> {
    fn run(&mut self, root: *mut NodeData) -> PResult<()> {
        let buf = self.buf;
        let mut cur = root;

        while self.pos < buf.len() {
            match memchr(b'<', &buf[self.pos..]) {
                Some(0) => {}
                Some(rel) => {
                    let end = self.pos + rel;
                    self.text(cur, self.pos, end)?;
                    self.pos = end;
                }
                None => {
                    self.text(cur, self.pos, buf.len())?;
                    self.pos = buf.len();
                    break;
                }
            }

            // buf[self.pos] == b'<'
            let tag_start = self.pos;
            self.pos += 1;
            let Some(&c) = buf.get(self.pos) else {
                return Err((ParseStatus::UnrecognizedTag, tag_start));
            };
            match c {
                b'/' => {
                    self.pos += 1;
                    cur = self.end_tag(cur, root)?;
                }
                b'!' => {
                    self.pos += 1;
                    self.exclamation(cur, root)?;
                }
                b'?' => {
                    self.pos += 1;
                    self.question(cur, root)?;
                }
                c if is_name_start(c) => {
                    cur = self.start_tag(cur)?;
                }
                _ => return Err((ParseStatus::UnrecognizedTag, tag_start)),
            }
        }

        if cur != root {
            // Something was left open.
            return Err((ParseStatus::EndElementMismatch, self.pos));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entity plumbing
    // ------------------------------------------------------------------

    fn append(&mut self, parent: *mut NodeData, kind: NodeKind) -> PResult<*mut NodeData> {
        unsafe {
            let alloc = &mut *self.alloc;
            let node = tree::allocate_node(alloc, kind);
            if node.is_null() {
                return Err((ParseStatus::OutOfMemory, self.pos));
            }
            tree::append_node(node, parent);
            Ok(node)
        }
    }

    /// A string reference borrowing from the input buffer.
    fn borrowed(&self, start: usize, end: usize) -> RawStr {
        RawStr {
            ptr: self.buf[start..end].as_ptr() as *mut u8,
            len: end - start,
        }
    }

    /// The buffer slice as text; the whole buffer was UTF-8 validated before
    /// parsing started.
    fn text_slice(&self, start: usize, end: usize) -> &'b str {
        unsafe { std::str::from_utf8_unchecked(&self.buf[start..end]) }
    }

    /// Stores a possibly-decoded string on an entity: borrowed from the
    /// input buffer when unchanged, copied into the arena otherwise.
    fn store(
        &mut self,
        dest: &mut RawStr,
        allocated: &mut bool,
        start: usize,
        end: usize,
        decoded: Cow<'b, str>,
    ) -> PResult<()> {
        match decoded {
            Cow::Borrowed(_) => {
                *dest = self.borrowed(start, end);
                *allocated = false;
                Ok(())
            }
            Cow::Owned(text) => {
                let ok = unsafe {
                    let alloc = &mut *self.alloc;
                    tree::set_entity_str(alloc, dest, allocated, &text)
                };
                if ok {
                    Ok(())
                } else {
                    Err((ParseStatus::OutOfMemory, self.pos))
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    fn text(&mut self, parent: *mut NodeData, start: usize, end: usize) -> PResult<()> {
        let raw = &self.buf[start..end];
        if !self.options.contains(ParseOptions::WS_PCDATA)
            && raw.iter().all(|b| b.is_ascii_whitespace())
        {
            return Ok(());
        }

        let node = self.append(parent, NodeKind::Pcdata)?;
        let decoded = decode_pcdata(self.text_slice(start, end), self.options);
        unsafe {
            let data = &mut *node;
            self.store(
                &mut data.value,
                &mut data.header.value_allocated,
                start,
                end,
                decoded,
            )
        }
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    fn scan_name(&mut self) -> PResult<(usize, usize)> {
        let buf = self.buf;
        let start = self.pos;
        while self.pos < buf.len() && is_name_char(buf[self.pos]) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err((ParseStatus::BadStartElement, start));
        }
        Ok((start, self.pos))
    }

    fn skip_whitespace(&mut self) {
        let buf = self.buf;
        while self.pos < buf.len() && buf[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn start_tag(&mut self, cur: *mut NodeData) -> PResult<*mut NodeData> {
        let (name_start, name_end) = self.scan_name()?;

        let node = self.append(cur, NodeKind::Element)?;
        unsafe {
            (*node).name = self.borrowed(name_start, name_end);
        }

        loop {
            self.skip_whitespace();
            let Some(&c) = self.buf.get(self.pos) else {
                return Err((ParseStatus::BadStartElement, self.pos));
            };
            match c {
                b'>' => {
                    self.pos += 1;
                    return Ok(node);
                }
                b'/' => {
                    if self.buf.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        return Ok(cur);
                    }
                    return Err((ParseStatus::BadStartElement, self.pos));
                }
                c if is_name_start(c) => self.attribute(node)?,
                _ => return Err((ParseStatus::BadAttribute, self.pos)),
            }
        }
    }

    fn attribute(&mut self, node: *mut NodeData) -> PResult<()> {
        let (name_start, name_end) = self.scan_name()?;

        let attr = unsafe {
            let alloc = &mut *self.alloc;
            let attr = tree::allocate_attribute(alloc);
            if attr.is_null() {
                return Err((ParseStatus::OutOfMemory, self.pos));
            }
            tree::append_attribute(attr, node);
            (*attr).name = self.borrowed(name_start, name_end);
            attr
        };

        self.skip_whitespace();
        if self.buf.get(self.pos) != Some(&b'=') {
            // Valueless attribute, common in HTML (`<input disabled>`).
            return Ok(());
        }
        self.pos += 1;
        self.skip_whitespace();

        let (value_start, value_end) = match self.buf.get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                let Some(rel) = memchr(quote, &self.buf[start..]) else {
                    return Err((ParseStatus::BadAttribute, start));
                };
                self.pos = start + rel + 1;
                (start, start + rel)
            }
            Some(_) => {
                let start = self.pos;
                let buf = self.buf;
                while self.pos < buf.len()
                    && !buf[self.pos].is_ascii_whitespace()
                    && buf[self.pos] != b'>'
                    && buf[self.pos] != b'/'
                {
                    self.pos += 1;
                }
                if self.pos == start {
                    return Err((ParseStatus::BadAttribute, start));
                }
                (start, self.pos)
            }
            None => return Err((ParseStatus::BadAttribute, self.pos)),
        };

        let decoded = decode_attribute(self.text_slice(value_start, value_end), self.options);
        unsafe {
            let data = &mut *attr;
            self.store(
                &mut data.value,
                &mut data.header.value_allocated,
                value_start,
                value_end,
                decoded,
            )
        }
    }

    fn end_tag(&mut self, cur: *mut NodeData, root: *mut NodeData) -> PResult<*mut NodeData> {
        let name_start = self.pos;
        let buf = self.buf;
        while self.pos < buf.len() && is_name_char(buf[self.pos]) {
            self.pos += 1;
        }
        let name_end = self.pos;
        if name_end == name_start {
            return Err((ParseStatus::BadEndElement, name_start));
        }

        self.skip_whitespace();
        if self.buf.get(self.pos) != Some(&b'>') {
            return Err((ParseStatus::BadEndElement, self.pos));
        }
        self.pos += 1;

        if cur == root {
            // Closing tag with nothing open.
            return Err((ParseStatus::EndElementMismatch, name_start));
        }
        let open_name = unsafe { (*cur).name };
        if self.buf[name_start..name_end]
            != *unsafe { open_name.as_str() }.as_bytes()
        {
            return Err((ParseStatus::EndElementMismatch, name_start));
        }

        Ok(unsafe { (*cur).parent })
    }

    // ------------------------------------------------------------------
    // <!...> constructs
    // ------------------------------------------------------------------

    fn exclamation(&mut self, cur: *mut NodeData, root: *mut NodeData) -> PResult<()> {
        let buf = self.buf;
        let rest = &buf[self.pos..];

        if rest.starts_with(b"--") {
            let start = self.pos + 2;
            let Some(rel) = memmem::find(&buf[start..], b"-->") else {
                return Err((ParseStatus::BadComment, self.pos - 2));
            };
            let end = start + rel;
            self.pos = end + 3;
            if self.options.contains(ParseOptions::COMMENTS) {
                let node = self.append(cur, NodeKind::Comment)?;
                let decoded = normalize_eol(self.text_slice(start, end), self.options);
                unsafe {
                    let data = &mut *node;
                    self.store(
                        &mut data.value,
                        &mut data.header.value_allocated,
                        start,
                        end,
                        decoded,
                    )?;
                }
            }
            return Ok(());
        }

        if rest.starts_with(b"[CDATA[") {
            let start = self.pos + 7;
            let Some(rel) = memmem::find(&buf[start..], b"]]>") else {
                return Err((ParseStatus::BadCdata, self.pos - 2));
            };
            let end = start + rel;
            self.pos = end + 3;
            if self.options.contains(ParseOptions::CDATA) {
                let node = self.append(cur, NodeKind::Cdata)?;
                let decoded = normalize_eol(self.text_slice(start, end), self.options);
                unsafe {
                    let data = &mut *node;
                    self.store(
                        &mut data.value,
                        &mut data.header.value_allocated,
                        start,
                        end,
                        decoded,
                    )?;
                }
            }
            return Ok(());
        }

        if rest.len() >= 7 && rest[..7].eq_ignore_ascii_case(b"DOCTYPE") {
            self.pos += 7;
            self.skip_whitespace();
            let start = self.pos;

            // The doctype may contain a bracketed internal subset.
            let mut depth = 0usize;
            loop {
                let Some(&c) = buf.get(self.pos) else {
                    return Err((ParseStatus::BadDoctype, start));
                };
                self.pos += 1;
                match c {
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => break,
                    _ => {}
                }
            }
            let end = self.pos - 1;

            if self.options.contains(ParseOptions::DOCTYPE) {
                let node = self.append(root, NodeKind::Doctype)?;
                unsafe {
                    (*node).value = self.borrowed(start, end);
                }
            }
            return Ok(());
        }

        Err((ParseStatus::UnrecognizedTag, self.pos - 2))
    }

    // ------------------------------------------------------------------
    // <?...?> constructs
    // ------------------------------------------------------------------

    fn question(&mut self, cur: *mut NodeData, root: *mut NodeData) -> PResult<()> {
        let tag_start = self.pos - 2;
        let buf = self.buf;

        let name_start = self.pos;
        while self.pos < buf.len() && is_name_char(buf[self.pos]) {
            self.pos += 1;
        }
        let name_end = self.pos;
        if name_end == name_start {
            return Err((ParseStatus::BadPi, tag_start));
        }

        let Some(rel) = memmem::find(&buf[self.pos..], b"?>") else {
            return Err((ParseStatus::BadPi, tag_start));
        };
        let body_end = self.pos + rel;

        let name = &buf[name_start..name_end];
        let is_declaration = name.eq_ignore_ascii_case(b"xml");

        if is_declaration {
            // Declarations are only meaningful at document level.
            if self.options.contains(ParseOptions::DECLARATION) && cur == root {
                let node = self.append(root, NodeKind::Declaration)?;
                unsafe {
                    (*node).name = self.borrowed(name_start, name_end);
                }
                loop {
                    self.skip_whitespace();
                    if self.pos >= body_end {
                        break;
                    }
                    if !is_name_start(buf[self.pos]) {
                        return Err((ParseStatus::BadPi, self.pos));
                    }
                    self.attribute(node)?;
                }
            }
        } else if self.options.contains(ParseOptions::PI) {
            let node = self.append(cur, NodeKind::Pi)?;
            unsafe {
                (*node).name = self.borrowed(name_start, name_end);
            }
            self.skip_whitespace();
            let value_start = self.pos.min(body_end);
            unsafe {
                (*node).value = self.borrowed(value_start, body_end);
            }
        }

        self.pos = body_end + 2;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Text decoding
// ----------------------------------------------------------------------------

fn normalize_eol(text: &str, options: ParseOptions) -> Cow<'_, str> {
    if !options.contains(ParseOptions::EOL) || !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Longest reference body the scanner will consider; `#x10FFFF` is the
/// longest well-formed numeric form and the named references are shorter.
const MAX_ENTITY_BODY: usize = 16;

/// Expands one entity reference starting just past `&`. Returns the expanded
/// character and the number of input bytes consumed, or `None` when the
/// reference is not well-formed (in which case the `&` is kept literally).
/// The semicolon scan stops at whitespace, `&` or `<` and is capped at
/// [`MAX_ENTITY_BODY`] bytes, so a stray ampersand never walks the rest of
/// the text.
fn expand_entity(rest: &str) -> Option<(char, usize)> {
    let mut semi = None;
    for (i, &b) in rest.as_bytes().iter().take(MAX_ENTITY_BODY + 1).enumerate() {
        match b {
            b';' => {
                semi = Some(i);
                break;
            }
            b'&' | b'<' | b' ' | b'\t' | b'\r' | b'\n' => break,
            _ => {}
        }
    }
    // `;` is ASCII, slicing at its index stays on a char boundary.
    let semi = semi?;
    let body = &rest[..semi];
    let expanded = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let digits = body.strip_prefix('#')?;
            let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                digits.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some((expanded, semi + 1))
}

fn decode_pcdata(text: &str, options: ParseOptions) -> Cow<'_, str> {
    let escapes = options.contains(ParseOptions::ESCAPES) && text.contains('&');
    if !escapes {
        return normalize_eol(text, options);
    }

    let eol = options.contains(ParseOptions::EOL);
    let mut out = String::with_capacity(text.len());
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        match c {
            '&' => match expand_entity(&text[i + 1..]) {
                Some((expanded, consumed)) => {
                    out.push(expanded);
                    // Skip the reference body.
                    while let Some(&(j, _)) = iter.peek() {
                        if j > i + consumed {
                            break;
                        }
                        iter.next();
                    }
                }
                None => out.push('&'),
            },
            '\r' if eol => {
                if iter.peek().map(|&(_, c)| c) == Some('\n') {
                    iter.next();
                }
                out.push('\n');
            }
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn decode_attribute(text: &str, options: ParseOptions) -> Cow<'_, str> {
    let wconv = options.contains(ParseOptions::WCONV_ATTRIBUTE);
    let escapes = options.contains(ParseOptions::ESCAPES) && text.contains('&');
    let needs_wconv = wconv && text.bytes().any(|b| matches!(b, b'\t' | b'\r' | b'\n'));

    if !escapes && !needs_wconv {
        return normalize_eol(text, options);
    }

    let eol = options.contains(ParseOptions::EOL);
    let mut out = String::with_capacity(text.len());
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        match c {
            '&' if escapes => match expand_entity(&text[i + 1..]) {
                Some((expanded, consumed)) => {
                    out.push(expanded);
                    while let Some(&(j, _)) = iter.peek() {
                        if j > i + consumed {
                            break;
                        }
                        iter.next();
                    }
                }
                None => out.push('&'),
            },
            '\r' if wconv || eol => {
                if iter.peek().map(|&(_, c)| c) == Some('\n') {
                    iter.next();
                }
                out.push(if wconv { ' ' } else { '\n' });
            }
            '\t' | '\n' if wconv => out.push(' '),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
