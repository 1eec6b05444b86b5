//! Thin glue over the KV index: a schema catalog stored in a reserved key
//! namespace, and row-level Select/Insert/Upsert/Update/Delete built from
//! the row codec plus `Kv`.

use std::path::PathBuf;

use crate::kv::{Kv, UpdateMode};
use crate::row::{self, Row};
use crate::schema::Schema;
use crate::sql::{Stmt, StmtCreateTable, StmtDelete, StmtInsert, StmtSelect, StmtUpdate};
use crate::util::status::{KvError, Result, Status};

const CATALOG_PREFIX: &str = "@schema_";

fn catalog_key(table: &str) -> Vec<u8> {
    format!("{}{}", CATALOG_PREFIX, table).into_bytes()
}

/// The database facade: one open log file, a schema catalog, and row-level
/// operations dispatched through the KV index.
pub struct Db {
    kv: Kv,
}

impl Db {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Db { kv: Kv::open(path)? })
    }

    pub fn close(&mut self) -> Result<()> {
        self.kv.close()
    }

    /// Registers a new table. Fails with `TableExists` if the name is
    /// already present in the catalog.
    pub fn create_table(&mut self, schema: Schema) -> Result<()> {
        let key = catalog_key(&schema.table);
        if self.kv.contains_key(&key) {
            return Err(KvError::new(
                Status::TableExists,
                Some(&format!("table {} already exists", schema.table)),
            ));
        }
        self.kv.set(&key, &schema.encode(), UpdateMode::Insert)?;
        info!("created table {}", schema.table);
        Ok(())
    }

    /// Looks up a table's schema. Fails with `TableNotFound` if absent.
    pub fn schema(&self, table: &str) -> Result<Schema> {
        match self.kv.get(&catalog_key(table)) {
            Some(bytes) => Schema::decode(bytes),
            None => Err(KvError::new(
                Status::TableNotFound,
                Some(&format!("table {} not found", table)),
            )),
        }
    }

    /// Fills `row`'s non-pkey positions from the stored value, if the row
    /// (identified by its pkey positions) exists. Returns whether it did.
    pub fn select(&self, schema: &Schema, row: &mut Row) -> Result<bool> {
        let key = row::encode_key(schema, row)?;
        match self.kv.get(&key) {
            Some(val) => {
                row::decode_val(schema, row, val)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Inserts `row`. Fails with `UpdateModeViolation` if its primary key
    /// is already present.
    pub fn insert(&mut self, schema: &Schema, row: &Row) -> Result<bool> {
        self.set_ex(schema, row, UpdateMode::Insert)
    }

    /// Inserts or overwrites `row`.
    pub fn upsert(&mut self, schema: &Schema, row: &Row) -> Result<bool> {
        self.set_ex(schema, row, UpdateMode::Upsert)
    }

    /// Overwrites `row`. Fails with `UpdateModeViolation` if its primary
    /// key is absent.
    pub fn update(&mut self, schema: &Schema, row: &Row) -> Result<bool> {
        self.set_ex(schema, row, UpdateMode::Update)
    }

    fn set_ex(&mut self, schema: &Schema, row: &Row, mode: UpdateMode) -> Result<bool> {
        let key = row::encode_key(schema, row)?;
        let val = row::encode_val(schema, row)?;
        let existed = self.kv.contains_key(&key);
        let updating = self.kv.set(&key, &val, mode)?;
        match mode {
            UpdateMode::Insert if existed => Err(KvError::new(
                Status::UpdateModeViolation,
                Some("insert: primary key already exists"),
            )),
            UpdateMode::Update if !existed => Err(KvError::new(
                Status::UpdateModeViolation,
                Some("update: primary key does not exist"),
            )),
            _ => Ok(updating),
        }
    }

    /// Deletes the row identified by `row`'s pkey positions. Returns
    /// whether anything was deleted.
    pub fn delete(&mut self, schema: &Schema, row: &Row) -> Result<bool> {
        let key = row::encode_key(schema, row)?;
        self.kv.del(&key)
    }

    /// Executes one parsed statement, dispatching to the primitives above.
    pub fn exec(&mut self, stmt: Stmt) -> Result<ExecResult> {
        match stmt {
            Stmt::CreateTable(s) => self.exec_create_table(s).map(|_| ExecResult::Ok),
            Stmt::Select(s) => self.exec_select(s).map(ExecResult::Row),
            Stmt::Insert(s) => self.exec_insert(s).map(ExecResult::Changed),
            Stmt::Update(s) => self.exec_update(s).map(ExecResult::Changed),
            Stmt::Delete(s) => self.exec_delete(s).map(ExecResult::Changed),
        }
    }

    fn exec_create_table(&mut self, stmt: StmtCreateTable) -> Result<()> {
        let schema = Schema::new(stmt.table, stmt.cols, stmt.pkey)?;
        self.create_table(schema)
    }

    fn exec_select(&mut self, stmt: StmtSelect) -> Result<Option<Row>> {
        let schema = self.schema(&stmt.table)?;
        let mut row = row::new_row(&schema);
        self.bind_keys(&schema, &mut row, &stmt.keys)?;
        if self.select(&schema, &mut row)? {
            Ok(Some(row))
        } else {
            Ok(None)
        }
    }

    fn exec_insert(&mut self, stmt: StmtInsert) -> Result<bool> {
        let schema = self.schema(&stmt.table)?;
        if stmt.values.len() != schema.cols.len() {
            return Err(KvError::new(
                Status::SchemaMismatch,
                Some("insert value count does not match column count"),
            ));
        }
        self.insert(&schema, &stmt.values)
    }

    fn exec_update(&mut self, stmt: StmtUpdate) -> Result<bool> {
        let schema = self.schema(&stmt.table)?;
        let mut assignments = Vec::with_capacity(stmt.assignments.len());
        for (col, val) in &stmt.assignments {
            let idx = schema
                .col_index(col)
                .ok_or_else(|| KvError::new(Status::Corruption, Some("unknown column in SET")))?;
            if schema.is_pkey(idx) {
                return Err(KvError::new(
                    Status::PKeyImmutable,
                    Some("UPDATE may not modify a primary key column"),
                ));
            }
            assignments.push((idx, val.clone()));
        }
        let mut row = row::new_row(&schema);
        self.bind_keys(&schema, &mut row, &stmt.keys)?;
        if !self.select(&schema, &mut row)? {
            return Err(KvError::new(
                Status::UpdateModeViolation,
                Some("update: primary key does not exist"),
            ));
        }
        for (idx, val) in assignments {
            row[idx] = val;
        }
        self.update(&schema, &row)
    }

    fn exec_delete(&mut self, stmt: StmtDelete) -> Result<bool> {
        let schema = self.schema(&stmt.table)?;
        let mut row = row::new_row(&schema);
        self.bind_keys(&schema, &mut row, &stmt.keys)?;
        self.delete(&schema, &row)
    }

    fn bind_keys(
        &self,
        schema: &Schema,
        row: &mut Row,
        keys: &[(String, crate::cell::Cell)],
    ) -> Result<()> {
        for (col, val) in keys {
            let idx = schema
                .col_index(col)
                .ok_or_else(|| KvError::new(Status::Corruption, Some("unknown column in WHERE")))?;
            if !schema.is_pkey(idx) {
                return Err(KvError::new(
                    Status::NotPrimaryKey,
                    Some("WHERE column is not part of the primary key"),
                ));
            }
            row[idx] = val.clone();
        }
        Ok(())
    }
}

/// The outcome of `Db::exec`.
#[derive(Debug)]
pub enum ExecResult {
    /// `CREATE TABLE` succeeded.
    Ok,
    /// `SELECT`'s result row, if the primary key matched anything.
    Row(Option<Row>),
    /// Whether `INSERT`/`UPDATE`/`DELETE` changed anything.
    Changed(bool),
}
