/// Record-storage API module.
///
/// This module provides the generic CRUD record client (fields/where/orderBy
/// queries, batch create/update/delete with per-record results) and its HTTP
/// implementation.
mod client;
mod types;

pub use client::{HttpRecordClient, HttpRecordClientBuilder, RecordClient, RecordError};
pub use types::{
    BatchEnvelope, Condition, Direction, Envelope, FetchParams, Operator, OrderBy, Paging,
    RecordFailure, RecordResult,
};
