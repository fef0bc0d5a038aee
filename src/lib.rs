//! Orderline: order ingestion with cache-aside lookups.
//!
//! Orders arrive as payloads on a message stream, are persisted to Postgres
//! as the system of record, and are served from an in-memory cache that is
//! rebuilt from the store on every start. The startup sequence is load-bearing:
//! schema, then restore, then the consumer, then reads.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
