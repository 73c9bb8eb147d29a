//! String-aware walking over source text.
//!
//! Every scanner shares these helpers to skip over string and character literals while matching delimiters.
//! All delimiters are ASCII, so byte offsets returned here are always valid `str` boundaries.

/// Which quoting styles start a literal for a given language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotes {
    pub single: bool,
    pub backtick: bool,
    /// Python `'''` and `"""`
    pub triple: bool,
}

impl Quotes {
    /// Go: interpreted strings, rune literals, raw strings.
    pub const GO: Self = Self { single: true, backtick: true, triple: false };

    /// C#, Java and C++: strings and character literals.
    pub const C_LIKE: Self = Self { single: true, backtick: false, triple: false };

    pub const PYTHON: Self = Self { single: true, backtick: false, triple: true };

    /// JavaScript and TypeScript, including template literals.
    pub const JS: Self = Self { single: true, backtick: true, triple: false };

    /// Rust: only `"`; a `'` usually starts a lifetime.
    pub const RUST: Self = Self { single: false, backtick: false, triple: false };

    const fn opens(self, c: u8) -> bool {
        match c {
            b'"' => true,
            b'\'' => self.single,
            b'`' => self.backtick,
            _ => false,
        }
    }
}

/// Byte offsets of `content[start..]` that lie outside string literals.
#[derive(Debug, Clone)]
pub struct CodeIndices<'a> {
    bytes: &'a [u8],
    pos: usize,
    quotes: Quotes,
}

impl<'a> CodeIndices<'a> {
    #[must_use]
    pub const fn new(content: &'a str, start: usize, quotes: Quotes) -> Self {
        Self {
            bytes: content.as_bytes(),
            pos: start,
            quotes,
        }
    }

    /// Offset just past the literal opening at `start`, or the end of input when unterminated.
    fn skip_literal(&self, start: usize) -> usize {
        let bytes = self.bytes;
        let quote = bytes[start];

        if self.quotes.triple && bytes.get(start + 1) == Some(&quote) && bytes.get(start + 2) == Some(&quote) {
            let mut i = start + 3;
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i] == quote && bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                    return i + 3;
                }
                i += 1;
            }
            return bytes.len();
        }

        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                c if c == quote => return i + 1,
                _ => i += 1,
            }
        }

        bytes.len()
    }
}

impl Iterator for CodeIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.pos < self.bytes.len() {
            let i = self.pos;
            if self.quotes.opens(self.bytes[i]) {
                self.pos = self.skip_literal(i);
                continue;
            }

            self.pos += 1;
            return Some(i);
        }

        None
    }
}

const fn closer(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Find the delimiter closing the one at `open_index`.
///
/// Returns the offset just past the closing delimiter, or `None` when `open_index` is not an opening
/// delimiter or the input ends first.
#[must_use]
pub fn find_closing(content: &str, open_index: usize, quotes: Quotes) -> Option<usize> {
    let bytes = content.as_bytes();
    let open = *bytes.get(open_index)?;
    let close = closer(open)?;

    let mut depth = 1usize;
    for i in CodeIndices::new(content, open_index + 1, quotes) {
        let c = bytes[i];
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
    }

    None
}

/// Find the end of the statement starting at `start`.
///
/// The walk stops at a `;` outside any nested delimiter, at a delimiter closing one opened before `start`,
/// or after `max_len` bytes. The returned offset is exclusive.
#[must_use]
pub fn find_statement_end(content: &str, start: usize, quotes: Quotes, max_len: Option<usize>) -> usize {
    let bytes = content.as_bytes();
    let limit = max_len.map_or(bytes.len(), |m| super::window_end(content, start, m));

    let mut depth = 0usize;
    for i in CodeIndices::new(content, start, quotes) {
        if i >= limit {
            return limit;
        }

        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            b';' if depth == 0 => return i,
            _ => {}
        }
    }

    limit
}

/// Split the inside of a delimited argument list on top-level commas.
///
/// `args` is the text between the delimiters, exclusive. Empty trailing arguments are dropped.
#[must_use]
pub fn split_top_level(args: &str, quotes: Quotes) -> Vec<&str> {
    let bytes = args.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut part_start = 0;

    for i in CodeIndices::new(args, 0, quotes) {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(args[part_start..i].trim());
                part_start = i + 1;
            }
            _ => {}
        }
    }

    let last = args[part_start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }

    parts
}

/// The value of `expr` when it is exactly one string literal.
///
/// Backslash escapes are resolved; anything else (concatenations, calls, identifiers) yields `None`.
#[must_use]
pub fn string_value(expr: &str, quotes: Quotes) -> Option<String> {
    let expr = expr.trim();
    let bytes = expr.as_bytes();
    let quote = *bytes.first()?;
    if !quotes.opens(quote) || bytes.len() < 2 || bytes[bytes.len() - 1] != quote {
        return None;
    }

    // a single literal leaves no code bytes behind
    if CodeIndices::new(expr, 0, quotes).next().is_some() {
        return None;
    }

    let delimiter = if quotes.triple && bytes.len() >= 6 && bytes[1] == quote && bytes[2] == quote { 3 } else { 1 };
    Some(unescape(&expr[delimiter..expr.len() - delimiter]))
}

fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
