//! # Stock Store
//!
//! 預測引擎的儲存實作：記憶體儲存（測試與示範用）與 SQLite 儲存

pub mod memory;
pub mod sqlite;

// Re-export 主要類型
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
