//! Order cache.
//!
//! The in-memory side of the cache-aside pair: lookups are served from here
//! and never from the durable store. The cache is rebuilt from the store at
//! startup (`application::restore`) and updated by the ingestion consumer
//! after every successful persist. It is deliberately unbounded — no
//! eviction, no TTL.

mod store;

pub use store::OrderCache;
