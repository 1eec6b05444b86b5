use std::fmt;
use std::io;

/// The kind of failure a `KvError` carries.
///
/// Names are conceptual rather than an exhaustive 1:1 mapping onto every call
/// site; several decode paths share a `Status` when they fail for the same
/// underlying reason (e.g. both cell-key decoders report `TruncatedKey`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A key-encoded cell ended before a terminator (Str) or before enough
    /// bytes were available (I64).
    TruncatedKey,
    /// A value-encoded cell ended before enough bytes were available.
    TruncatedValue,
    /// A row key's table-name prefix did not match the schema's table.
    BadKey,
    /// A decoder consumed fewer bytes than were supplied.
    TrailingGarbage,
    /// A row's length or a cell's tag disagreed with the schema.
    SchemaMismatch,
    /// A log record's checksum did not match its payload.
    BadChecksum,
    /// A read ended partway through a record (header or payload).
    UnexpectedEOF,
    /// Underlying I/O failure.
    IO,
    /// `CREATE TABLE` named a table that already exists.
    TableExists,
    /// An operation named a table with no matching catalog entry.
    TableNotFound,
    /// A `WHERE`/key column is not part of the table's primary key.
    NotPrimaryKey,
    /// `Set` was called with `UpdateMode::Update` against an absent key, or
    /// `UpdateMode::Insert` against a present one.
    UpdateModeViolation,
    /// `UPDATE ... SET` named a primary-key column.
    PKeyImmutable,
    /// A SQL statement failed to parse, or `CREATE TABLE` named a malformed
    /// schema (e.g. a duplicate primary-key column).
    Corruption,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// An error carrying a `Status` and an optional human-readable message.
#[derive(Debug)]
pub struct KvError {
    status: Status,
    msg: Option<String>,
}

impl KvError {
    pub fn new(status: Status, msg: Option<&str>) -> Self {
        KvError {
            status,
            msg: msg.map(String::from),
        }
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn description(&self) -> &str {
        self.msg.as_deref().unwrap_or("")
    }
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.msg {
            Some(m) => write!(f, "{}: {}", self.status, m),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for KvError {}

impl From<io::Error> for KvError {
    fn from(e: io::Error) -> Self {
        KvError::new(Status::IO, Some(&e.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
