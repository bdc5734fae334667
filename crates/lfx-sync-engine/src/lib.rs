//! The sync engine: dispatcher, handler registry, and the per-kind
//! handlers implementing the five-phase sync protocol.
//!
//! # Protocol
//!
//! Every upsert handler walks the same five phases:
//! 1. skip check (soft-delete / origin sentinels)
//! 2. v1 id extraction
//! 3. parent resolution against the mapping store
//! 4. forward-mapping lookup deciding create vs update
//! 5. effectuation (REST call or envelope publish) and mapping writeback
//!
//! Deletes read the forward mapping, effectuate when it is live, and
//! tombstone both directions. Handlers return an [`Outcome`]; the
//! dispatcher translates it into ack / negative-ack and owns the retry
//! budget (the broker's `max_deliver`).

mod context;
mod dispatcher;
mod error;
pub mod handlers;
mod outcome;
mod registry;

pub use context::{AUD_COMMITTEE, AUD_INDEXER, AUD_PROJECT, SyncContext};
pub use dispatcher::{Dispatcher, DispatcherSettings};
pub use error::EngineError;
pub use handlers::{HandlerDeps, MemoryObjectReader, ObjectReader, RecordHandler};
pub use outcome::Outcome;
pub use registry::HandlerRegistry;
