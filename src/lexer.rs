use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    EnumOpen(String),
    TableOpen(String),
    /// Any other line ending in `{`, e.g. `indexes {`.
    BlockOpen,
    Close,
    /// Text after `ref:`.
    Ref(String),
    Body(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub kind: LineKind,
}

/// Pieces of a `name type [settings]` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTokens<'a> {
    pub name: &'a str,
    pub typ: &'a str,
    pub settings: Option<&'a str>,
}

pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Classify every non-blank line. Line numbers are 1-based.
    pub fn tokenize(self) -> Vec<Line> {
        self.input
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                classify(raw).map(|kind| Line {
                    number: i + 1,
                    kind,
                })
            })
            .collect()
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

/// Cut a line at the first `//` that is not inside a quoted span.
pub fn strip_comment(line: &str) -> &str {
    let mut chars: Peekable<CharIndices> = line.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if is_quote(c) => quote = Some(c),
            None if c == '/' && matches!(chars.peek(), Some((_, '/'))) => return &line[..i],
            None => {}
        }
    }
    line
}

/// Remove one layer of matching quotes.
pub fn unquote(s: &str) -> &str {
    let s = s.trim();
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(a), Some(b)) if a == b && is_quote(a) && s.len() >= 2 => &s[1..s.len() - 1],
        _ => s,
    }
}

fn block_name(rest: &str) -> Option<String> {
    let rest = rest.trim().trim_end_matches('{').trim();
    let name = if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next().unwrap_or_default()
    } else {
        rest.split_whitespace().next().unwrap_or_default()
    };
    let name = name.trim_end_matches('{');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn keyword<'l>(line: &'l str, word: &str) -> Option<&'l str> {
    let head = line.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &line[word.len()..];
    if rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

pub fn classify(raw: &str) -> Option<LineKind> {
    let line = strip_comment(raw).trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('}') {
        return Some(LineKind::Close);
    }
    if let Some(name) = keyword(line, "enum").and_then(block_name) {
        return Some(LineKind::EnumOpen(name));
    }
    if let Some(name) = keyword(line, "table").and_then(block_name) {
        return Some(LineKind::TableOpen(name));
    }
    if line.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("ref:")) {
        return Some(LineKind::Ref(line[4..].trim().to_string()));
    }
    if line.ends_with('{') {
        return Some(LineKind::BlockOpen);
    }

    Some(LineKind::Body(line.to_string()))
}

/// Split a settings list on top-level commas. Commas inside quotes or
/// inside `[]`, `{}` or `()` do not split.
pub fn split_settings(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth: usize = 0;

    for c in input.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            current.push(c);
            continue;
        }

        match c {
            c if is_quote(c) => {
                quote = Some(c);
                current.push(c);
            }
            '[' | '{' | '(' => {
                depth += 1;
                current.push(c);
            }
            ']' | '}' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                let piece = current.trim();
                if !piece.is_empty() {
                    parts.push(piece.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let piece = current.trim();
    if !piece.is_empty() {
        parts.push(piece.to_string());
    }
    parts
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Read one token from the front of `s`: a quoted span, or a run up to
/// whitespace or `[` at parenthesis depth zero.
fn take_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let first = s.chars().next()?;

    if is_quote(first) {
        let end = s[1..].find(first)? + 2;
        return Some((&s[..end], &s[end..]));
    }

    let mut depth: usize = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '[' if depth == 0 => return Some((&s[..i], &s[i..])),
            c if c.is_whitespace() && depth == 0 => return Some((&s[..i], &s[i..])),
            _ => {}
        }
    }
    Some((s, ""))
}

/// Split a column line into name, type and the inside of its settings
/// brackets. Returns `None` for anything not shaped like a column.
pub fn split_column(line: &str) -> Option<ColumnTokens<'_>> {
    let (name_tok, rest) = take_token(line)?;
    let (typ_tok, rest) = take_token(rest)?;

    let name = unquote(name_tok);
    let name_quoted = name_tok.len() != name.len();
    if name.is_empty() || (!name_quoted && !is_ident(name)) {
        return None;
    }

    let typ = unquote(typ_tok);
    if !typ.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        return None;
    }

    let rest = rest.trim();
    let settings = if rest.is_empty() {
        None
    } else if rest.starts_with('[') && rest.ends_with(']') {
        Some(&rest[1..rest.len() - 1])
    } else {
        return None;
    };

    Some(ColumnTokens {
        name,
        typ,
        settings,
    })
}
