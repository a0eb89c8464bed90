//! Placeholder translation between the statement language and driver dialects
//!
//! Statements are written with `?` markers. Drivers declare their native
//! marker through [`PlaceholderStyle`]; the executor rewrites statements
//! right before dispatch. Markers inside quoted literals, backtick
//! identifiers and comments are left alone.

use std::borrow::Cow;

/// Positional parameter marker understood by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaceholderStyle {
    /// `?` markers (MySQL binary protocol). Statements pass through unchanged.
    #[default]
    Question,

    /// `%s` markers (format-string drivers). Literal `%` is escaped as `%%`.
    Percent,
}

impl PlaceholderStyle {
    /// The marker a single positional argument is written as.
    pub fn marker(self) -> &'static str {
        match self {
            PlaceholderStyle::Question => "?",
            PlaceholderStyle::Percent => "%s",
        }
    }

    /// Rewrite `?` markers in `sql` into this style.
    pub fn normalize(self, sql: &str) -> Cow<'_, str> {
        match self {
            PlaceholderStyle::Question => Cow::Borrowed(sql),
            PlaceholderStyle::Percent => Cow::Owned(rewrite(sql, self.marker(), true)),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

fn rewrite(sql: &str, marker: &str, escape_percent: bool) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut section = Section::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if escape_percent && c == '%' {
            out.push_str("%%");
            continue;
        }
        match section {
            Section::Quoted(q) => {
                out.push(c);
                if c == '\\' && q != '`' {
                    if let Some(escaped) = chars.next() {
                        if escape_percent && escaped == '%' {
                            out.push_str("%%");
                        } else {
                            out.push(escaped);
                        }
                    }
                } else if c == q {
                    // A doubled quote is an escaped quote, not the end
                    if chars.peek() == Some(&q) {
                        out.push(q);
                        chars.next();
                    } else {
                        section = Section::Code;
                    }
                }
            }
            Section::LineComment => {
                out.push(c);
                if c == '\n' {
                    section = Section::Code;
                }
            }
            Section::BlockComment => {
                out.push(c);
                if c == '*' && chars.peek() == Some(&'/') {
                    out.push('/');
                    chars.next();
                    section = Section::Code;
                }
            }
            Section::Code => {
                if c == '?' {
                    out.push_str(marker);
                } else {
                    out.push(c);
                }
                match c {
                    '\'' | '"' | '`' => section = Section::Quoted(c),
                    '#' => section = Section::LineComment,
                    // MySQL needs whitespace after `--` for a comment
                    '-' if chars.peek() == Some(&'-') => {
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().map_or(true, |n| n.is_whitespace()) {
                            out.push('-');
                            chars.next();
                            section = Section::LineComment;
                        }
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        out.push('*');
                        chars.next();
                        section = Section::BlockComment;
                    }
                    _ => {}
                }
            }
        }
    }

    out
}

/// Count the `?` markers outside quoted sections and comments.
pub fn count_placeholders(sql: &str) -> usize {
    rewrite(sql, "\u{0}", false)
        .chars()
        .filter(|c| *c == '\u{0}')
        .count()
}
