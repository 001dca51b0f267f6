//! Key-value engine.
//!
//! Everything lives in one table addressed by a partition key `pk` and a sort
//! key `sk`:
//!
//! | pk            | sk     | holds              |
//! |---------------|--------|--------------------|
//! | `s`           | from   | live link          |
//! | `d`           | from   | tombstone          |
//! | `h` + from    | when   | history entry      |
//!
//! [`KvTable`] is the minimal table surface; [`MemoryTable`] and
//! [`RedisTable`] implement it and [`KvStorage`] layers the storage contract
//! on top.

pub mod delete;
pub mod item;
pub mod key;
pub mod memory;
pub mod redis;
pub mod storage;
pub mod table;

pub use delete::{DeleteOutcome, DeleteProcedure};
pub use item::Item;
pub use key::Partition;
pub use memory::MemoryTable;
pub use redis::RedisTable;
pub use storage::KvStorage;
pub use table::{KvTable, Page, QueryPaginator};
