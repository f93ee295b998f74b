/// Contracts for external collaborators. Implementations live outside the
/// core; the in-memory catalog here backs tests and the demo server.
mod catalog;
mod channel_sink;
mod metadata;
mod suggestion;

pub use catalog::{ContentCatalog, InMemoryCatalog};
pub use channel_sink::{ChannelRef, ChannelSink};
pub use metadata::MetadataProvider;
pub use suggestion::SuggestionModel;
