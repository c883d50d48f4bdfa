//! Just enough statement recognition to find the table a write targets.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// The table a write statement targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget<'a> {
    pub kind: WriteKind,
    /// The table name without any quoting.
    pub table: &'a str,
    /// Byte range of the table reference in the statement, quotes included.
    pub span: Range<usize>,
}

/// Recognise `INSERT INTO <table>`, `UPDATE <table>` and `DELETE FROM <table>` at the start of
/// a statement. Keywords are case-insensitive.
pub fn write_target(sql: &str) -> Option<WriteTarget<'_>> {
    let mut words = Words { sql, position: 0 };
    let kind = match words.next_word()?.to_ascii_uppercase().as_str() {
        "INSERT" => {
            words.expect("INTO")?;
            WriteKind::Insert
        }
        "UPDATE" => WriteKind::Update,
        "DELETE" => {
            words.expect("FROM")?;
            WriteKind::Delete
        }
        _ => return None,
    };
    let span = words.next_table()?;
    let table = sql[span.clone()].trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'));
    if table.is_empty() {
        return None;
    }
    Some(WriteTarget { kind, table, span })
}

struct Words<'a> {
    sql: &'a str,
    position: usize,
}

impl<'a> Words<'a> {
    fn skip_whitespace(&mut self) {
        let rest = &self.sql[self.position..];
        self.position += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> Range<usize> {
        self.skip_whitespace();
        let start = self.position;
        let rest = &self.sql[start..];
        let len = rest.find(|c| !accept(c)).unwrap_or(rest.len());
        self.position += len;
        start..self.position
    }

    fn next_word(&mut self) -> Option<&'a str> {
        let sql = self.sql;
        let span = self.take_while(|c| c.is_ascii_alphabetic());
        (!span.is_empty()).then(|| &sql[span])
    }

    fn expect(&mut self, keyword: &str) -> Option<()> {
        self.next_word()
            .filter(|word| word.eq_ignore_ascii_case(keyword))
            .map(|_| ())
    }

    fn next_table(&mut self) -> Option<Range<usize>> {
        let span = self.take_while(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '.' | '"' | '`' | '[' | ']')
        });
        (!span.is_empty()).then_some(span)
    }
}
