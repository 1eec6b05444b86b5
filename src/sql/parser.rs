//! Hand-rolled scanner/parser for the statement grammar. ASCII keywords are
//! matched case-insensitively; identifiers follow the usual
//! letter-or-underscore-start, letter-digit-underscore-continue rule.

use crate::cell::{Cell, CellTag};
use crate::schema::Column;
use crate::sql::{Stmt, StmtCreateTable, StmtDelete, StmtInsert, StmtSelect, StmtUpdate};
use crate::util::status::{KvError, Result, Status};

pub struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            buf: input.as_bytes(),
            pos: 0,
        }
    }

    fn is_space(ch: u8) -> bool {
        matches!(ch, b'\t' | b'\n' | 0x0B | 0x0C | b'\r' | b' ')
    }

    fn is_alpha(ch: u8) -> bool {
        (ch | 0x20).is_ascii_lowercase()
    }

    fn is_digit(ch: u8) -> bool {
        ch.is_ascii_digit()
    }

    fn is_name_start(ch: u8) -> bool {
        Self::is_alpha(ch) || ch == b'_'
    }

    fn is_name_continue(ch: u8) -> bool {
        Self::is_alpha(ch) || Self::is_digit(ch) || ch == b'_'
    }

    fn skip_spaces(&mut self) {
        while self.pos < self.buf.len() && Self::is_space(self.buf[self.pos]) {
            self.pos += 1;
        }
    }

    /// Skips trailing spaces and reports whether the input is exhausted.
    pub fn is_end(&mut self) -> bool {
        self.skip_spaces();
        self.pos >= self.buf.len()
    }

    fn try_keyword(&mut self, kw: &str) -> bool {
        self.skip_spaces();
        let kw = kw.as_bytes();
        if self.pos + kw.len() > self.buf.len() {
            return false;
        }
        for (i, &want) in kw.iter().enumerate() {
            if self.buf[self.pos + i].to_ascii_lowercase() != want.to_ascii_lowercase() {
                return false;
            }
        }
        let end = self.pos + kw.len();
        if end < self.buf.len() && Self::is_name_continue(self.buf[end]) {
            return false;
        }
        self.pos = end;
        true
    }

    fn peek_keyword(&mut self, kw: &str) -> bool {
        let save = self.pos;
        let matched = self.try_keyword(kw);
        self.pos = save;
        matched
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.try_keyword(kw) {
            Ok(())
        } else {
            Err(KvError::new(
                Status::Corruption,
                Some(&format!("expected keyword '{}'", kw)),
            ))
        }
    }

    fn try_name(&mut self) -> Option<String> {
        self.skip_spaces();
        if self.pos >= self.buf.len() || !Self::is_name_start(self.buf[self.pos]) {
            return None;
        }
        let start = self.pos;
        while self.pos < self.buf.len() && Self::is_name_continue(self.buf[self.pos]) {
            self.pos += 1;
        }
        Some(String::from_utf8_lossy(&self.buf[start..self.pos]).into_owned())
    }

    fn expect_name(&mut self) -> Result<String> {
        self.try_name()
            .ok_or_else(|| KvError::new(Status::Corruption, Some("expected a name")))
    }

    fn try_punct(&mut self, ch: u8) -> bool {
        self.skip_spaces();
        if self.pos < self.buf.len() && self.buf[self.pos] == ch {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, ch: u8) -> Result<()> {
        if self.try_punct(ch) {
            Ok(())
        } else {
            Err(KvError::new(
                Status::Corruption,
                Some(&format!("expected '{}'", ch as char)),
            ))
        }
    }

    /// Parses an integer or single/double-quoted string literal. Quoted
    /// strings recognize `\'`, `\"` and `\\` as escapes; any other
    /// backslash sequence is a parse error.
    pub fn parse_value(&mut self, out: &mut Cell) -> Result<()> {
        self.skip_spaces();
        if self.pos >= self.buf.len() {
            return Err(KvError::new(Status::Corruption, Some("expected a literal")));
        }
        let ch = self.buf[self.pos];
        if ch == b'-' || Self::is_digit(ch) {
            let start = self.pos;
            if ch == b'-' {
                self.pos += 1;
            }
            if self.pos >= self.buf.len() || !Self::is_digit(self.buf[self.pos]) {
                return Err(KvError::new(Status::Corruption, Some("malformed integer literal")));
            }
            while self.pos < self.buf.len() && Self::is_digit(self.buf[self.pos]) {
                self.pos += 1;
            }
            let text = std::str::from_utf8(&self.buf[start..self.pos])
                .map_err(|_| KvError::new(Status::Corruption, Some("malformed integer literal")))?;
            let value: i64 = text
                .parse()
                .map_err(|_| KvError::new(Status::Corruption, Some("integer literal out of range")))?;
            *out = Cell::I64(value);
            Ok(())
        } else if ch == b'\'' || ch == b'"' {
            let quote = ch;
            self.pos += 1;
            let mut bytes = Vec::new();
            loop {
                if self.pos >= self.buf.len() {
                    return Err(KvError::new(Status::Corruption, Some("unterminated string literal")));
                }
                let c = self.buf[self.pos];
                if c == b'\\' {
                    if self.pos + 1 >= self.buf.len() {
                        return Err(KvError::new(Status::Corruption, Some("dangling escape in string literal")));
                    }
                    let next = self.buf[self.pos + 1];
                    match next {
                        b'\'' | b'"' | b'\\' => {
                            bytes.push(next);
                            self.pos += 2;
                        }
                        _ => {
                            return Err(KvError::new(
                                Status::Corruption,
                                Some("unsupported escape sequence in string literal"),
                            ))
                        }
                    }
                } else if c == quote {
                    self.pos += 1;
                    break;
                } else {
                    bytes.push(c);
                    self.pos += 1;
                }
            }
            *out = Cell::Str(bytes);
            Ok(())
        } else {
            Err(KvError::new(Status::Corruption, Some("expected a literal")))
        }
    }

    fn parse_literal(&mut self) -> Result<Cell> {
        let mut cell = Cell::I64(0);
        self.parse_value(&mut cell)?;
        Ok(cell)
    }

    /// `name = literal (AND name = literal)*` when `and_separated`, else
    /// `name = literal (, name = literal)*`. Shared by WHERE clauses and
    /// UPDATE's SET list.
    fn parse_pair_list(&mut self, and_separated: bool) -> Result<Vec<(String, Cell)>> {
        let mut out = Vec::new();
        loop {
            let name = self.expect_name()?;
            self.expect_punct(b'=')?;
            let value = self.parse_literal()?;
            out.push((name, value));
            let cont = if and_separated {
                self.try_keyword("and")
            } else {
                self.try_punct(b',')
            };
            if !cont {
                break;
            }
        }
        Ok(out)
    }

    pub fn parse_stmt(&mut self) -> Result<Stmt> {
        if self.peek_keyword("select") {
            self.parse_select().map(Stmt::Select)
        } else if self.peek_keyword("create") {
            self.parse_create_table().map(Stmt::CreateTable)
        } else if self.peek_keyword("insert") {
            self.parse_insert().map(Stmt::Insert)
        } else if self.peek_keyword("update") {
            self.parse_update().map(Stmt::Update)
        } else if self.peek_keyword("delete") {
            self.parse_delete().map(Stmt::Delete)
        } else {
            Err(KvError::new(Status::Corruption, Some("unrecognized statement")))
        }
    }

    fn parse_select(&mut self) -> Result<StmtSelect> {
        self.expect_keyword("select")?;
        let mut cols = vec![self.expect_name()?];
        while self.try_punct(b',') {
            cols.push(self.expect_name()?);
        }
        self.expect_keyword("from")?;
        let table = self.expect_name()?;
        self.expect_keyword("where")?;
        let keys = self.parse_pair_list(true)?;
        self.expect_punct(b';')?;
        Ok(StmtSelect { table, cols, keys })
    }

    fn parse_create_table(&mut self) -> Result<StmtCreateTable> {
        self.expect_keyword("create")?;
        self.expect_keyword("table")?;
        let table = self.expect_name()?;
        self.expect_punct(b'(')?;

        let mut cols = Vec::new();
        while !self.peek_keyword("primary") {
            let name = self.expect_name()?;
            let ty = if self.try_keyword("string") {
                CellTag::Str
            } else if self.try_keyword("int64") {
                CellTag::I64
            } else {
                return Err(KvError::new(Status::Corruption, Some("expected a column type")));
            };
            cols.push(Column::new(name, ty));
            if !self.try_punct(b',') {
                break;
            }
        }

        self.expect_keyword("primary")?;
        self.expect_keyword("key")?;
        self.expect_punct(b'(')?;
        let mut pkey_names = vec![self.expect_name()?];
        while self.try_punct(b',') {
            pkey_names.push(self.expect_name()?);
        }
        self.expect_punct(b')')?;
        self.expect_punct(b')')?;
        self.expect_punct(b';')?;

        let mut pkey = Vec::with_capacity(pkey_names.len());
        for name in pkey_names {
            let idx = cols
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| KvError::new(Status::Corruption, Some("primary key references unknown column")))?;
            pkey.push(idx);
        }

        Ok(StmtCreateTable { table, cols, pkey })
    }

    fn parse_insert(&mut self) -> Result<StmtInsert> {
        self.expect_keyword("insert")?;
        self.expect_keyword("into")?;
        let table = self.expect_name()?;
        self.expect_keyword("values")?;
        self.expect_punct(b'(')?;
        let mut values = vec![self.parse_literal()?];
        while self.try_punct(b',') {
            values.push(self.parse_literal()?);
        }
        self.expect_punct(b')')?;
        self.expect_punct(b';')?;
        Ok(StmtInsert { table, values })
    }

    fn parse_update(&mut self) -> Result<StmtUpdate> {
        self.expect_keyword("update")?;
        let table = self.expect_name()?;
        self.expect_keyword("set")?;
        let assignments = self.parse_pair_list(false)?;
        self.expect_keyword("where")?;
        let keys = self.parse_pair_list(true)?;
        self.expect_punct(b';')?;
        Ok(StmtUpdate {
            table,
            assignments,
            keys,
        })
    }

    fn parse_delete(&mut self) -> Result<StmtDelete> {
        self.expect_keyword("delete")?;
        self.expect_keyword("from")?;
        let table = self.expect_name()?;
        self.expect_keyword("where")?;
        let keys = self.parse_pair_list(true)?;
        self.expect_punct(b';')?;
        Ok(StmtDelete { table, keys })
    }
}
