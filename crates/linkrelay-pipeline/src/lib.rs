//! LinkRelay ingestion pipeline
//!
//! Turns a stateless "list messages" source into an ordered forwarding stream:
//!
//! - [`UrlExtractor`] pulls links from text, entities, buttons and previews
//! - [`dedupe`] keeps the first candidate per normalized URL
//! - [`ContextFetcher`] gathers the conversation around a pivot message
//! - [`Poller`] owns the [`SyncCursor`] and drives one tick at a time
//! - [`Forwarder`] renders each enriched message and paces it into a [`DeliverySink`]

pub mod context;
pub mod cursor;
pub mod dedupe;
pub mod extract;
pub mod forwarder;
pub mod poller;
pub mod render;
pub mod source;

#[cfg(test)]
mod testing;

pub use context::ContextFetcher;
pub use cursor::SyncCursor;
pub use dedupe::dedupe;
pub use extract::{normalize_url, UrlExtractor};
pub use forwarder::{DeliveryReport, Forwarder, ForwarderConfig};
pub use poller::{Poller, PollerConfig, TickSummary};
pub use source::{DeliverySink, MessageSource};
