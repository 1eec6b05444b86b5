// Copyright 2019 Fullstop000 <fullstop1005@gmail.com>.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(clippy::unreadable_literal)]
#![allow(clippy::type_complexity)]

extern crate libc;
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod util;
pub mod cell;
pub mod db;
mod iterator;
pub mod kv;
mod log_file;
mod record;
pub mod row;
pub mod schema;
pub mod sql;

pub use cell::Cell;
pub use db::Db;
pub use iterator::KvIterator;
pub use kv::{Kv, UpdateMode};
pub use schema::{Column, Schema};
pub use util::status::{KvError, Result, Status};
