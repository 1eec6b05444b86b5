//! The SQL surface: a small hand-rolled recursive-descent parser over a
//! tagged statement enum, and nothing else — statements are executed by
//! `db::Db::exec`, which is the only thing that understands schemas.

pub mod parser;

use crate::cell::Cell;
use crate::schema::Column;

pub use parser::Parser;

/// A parsed SQL statement. A sum type, not a class hierarchy, per the
/// "dynamic statement variants" design note.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    CreateTable(StmtCreateTable),
    Select(StmtSelect),
    Insert(StmtInsert),
    Update(StmtUpdate),
    Delete(StmtDelete),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtCreateTable {
    pub table: String,
    pub cols: Vec<Column>,
    pub pkey: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtSelect {
    pub table: String,
    pub cols: Vec<String>,
    pub keys: Vec<(String, Cell)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtInsert {
    pub table: String,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtUpdate {
    pub table: String,
    pub assignments: Vec<(String, Cell)>,
    pub keys: Vec<(String, Cell)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtDelete {
    pub table: String,
    pub keys: Vec<(String, Cell)>,
}
