//! Session storage
//!
//! The trait-based design allows swapping between in-memory and SQLite
//! backends without the service noticing.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use traits::SessionStore;
