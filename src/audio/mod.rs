pub mod catalog;
pub mod output;
pub mod resolver;
pub mod sequencer;

pub use catalog::{Catalog, CatalogEntry};
pub use output::{AudioSink, CommandSpeaker, FetchOnlySink, Speaker};
pub use resolver::{AudioRef, AudioResolver};
pub use sequencer::{PlaybackSequencer, SequenceReport};
