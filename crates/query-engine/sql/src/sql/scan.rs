//! Placeholder scanning.
//!
//! Only placeholder tokens are recognised; the rest of the SQL text is opaque. For expansion,
//! quoted literals are not special-cased, so a `?` or `:name` inside a string literal counts as
//! a placeholder. Bind names, which drivers rewrite, are never looked for inside `'...'` or
//! `"..."` literals, since the database itself ignores literal contents.

/// The positional placeholder.
pub const POSITIONAL_PLACEHOLDER: char = '?';

/// A `:identifier` token found in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedToken<'a> {
    /// Byte offset of the colon.
    pub start: usize,
    /// Byte offset one past the last identifier character.
    pub end: usize,
    /// The identifier, without the colon.
    pub name: &'a str,
}

impl NamedToken<'_> {
    /// The token as written in the SQL text, colon included.
    pub fn token(&self) -> String {
        format!(":{}", self.name)
    }
}

/// Identifier characters: ASCII letters, underscore and hyphen. Digits are not included, so
/// `:foo1` is the token `:foo` followed by the text `1`.
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}

/// Characters of a bind name as drivers see them: expanded list keys such as `:ids_0` carry
/// digits, so ASCII alphanumerics count here in addition to the identifier characters.
pub fn is_bind_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Find every `:identifier` token, left to right. A colon not followed by at least one
/// identifier character is not a token.
pub fn scan_named(sql: &str) -> Vec<NamedToken<'_>> {
    scan(sql, is_identifier_char, false)
}

/// Find every bind name token, left to right, skipping quoted literals.
pub fn scan_bind_names(sql: &str) -> Vec<NamedToken<'_>> {
    scan(sql, is_bind_name_char, true)
}

fn scan(
    sql: &str,
    is_name_char: impl Fn(char) -> bool,
    skip_literals: bool,
) -> Vec<NamedToken<'_>> {
    let mut tokens = vec![];
    let mut chars = sql.char_indices().peekable();
    let mut quote = None;

    while let Some((start, c)) = chars.next() {
        if let Some(open) = quote {
            // a doubled quote closes and reopens, which leaves us inside the literal
            if c == open {
                quote = None;
            }
            continue;
        }
        if skip_literals && (c == '\'' || c == '"') {
            quote = Some(c);
            continue;
        }
        if c != ':' {
            continue;
        }
        let mut end = start + 1;
        while let Some(&(offset, next)) = chars.peek() {
            if !is_name_char(next) {
                break;
            }
            end = offset + next.len_utf8();
            chars.next();
        }
        if end > start + 1 {
            tokens.push(NamedToken {
                start,
                end,
                name: &sql[start + 1..end],
            });
        }
    }

    tokens
}

/// Split SQL text on every positional placeholder. The result always has one more fragment
/// than there are placeholders.
pub fn split_positional(sql: &str) -> Vec<&str> {
    sql.split(POSITIONAL_PLACEHOLDER).collect()
}

/// Rebuild SQL text with every named token replaced by what `replace` returns for it. Tokens
/// for which `replace` returns `None` are left as written.
pub fn replace_named<F>(sql: &str, replace: F) -> String
where
    F: FnMut(&NamedToken<'_>) -> Option<String>,
{
    replace_tokens(sql, scan_named(sql), replace)
}

/// [`replace_named`] over bind names, see [`scan_bind_names`].
pub fn replace_bind_names<F>(sql: &str, replace: F) -> String
where
    F: FnMut(&NamedToken<'_>) -> Option<String>,
{
    replace_tokens(sql, scan_bind_names(sql), replace)
}

fn replace_tokens<F>(sql: &str, tokens: Vec<NamedToken<'_>>, mut replace: F) -> String
where
    F: FnMut(&NamedToken<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(sql.len());
    let mut copied_up_to = 0;

    for token in tokens {
        if let Some(replacement) = replace(&token) {
            out.push_str(&sql[copied_up_to..token.start]);
            out.push_str(&replacement);
            copied_up_to = token.end;
        }
    }
    out.push_str(&sql[copied_up_to..]);
    out
}
