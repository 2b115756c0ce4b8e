//! Local persistence of in-flight flows.
//!
//! The front end keeps just enough of an in-progress order (or loan) in
//! local storage to redraw the payment screen after a restart without any
//! network call. Each flow kind owns exactly one key; a new snapshot
//! overwrites the previous one.

mod snapshot;
mod store;

pub use snapshot::{
    LOAN_KEY, LoanPersistence, ORDER_KEY, OrderPersistence, PersistedOrder, PersistedStep,
    Snapshot,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, PersistenceError};
