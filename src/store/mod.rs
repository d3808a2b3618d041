pub mod couch;
pub mod memory;
pub mod traits;

pub use couch::CouchStore;
pub use memory::InMemoryStore;
pub use traits::{DocumentStore, StoreError, ViewRow};
