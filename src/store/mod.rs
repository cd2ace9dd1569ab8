// Store module
// The pipeline is straight-line sequential code; everything here bridges the
// async store clients into bounded synchronous calls.

pub mod blocking;
pub mod status;
pub mod vector;

pub use blocking::BlockingBridge;
pub use status::{ChunkStatus, MetadataStore, StatusRecord, StatusTracker};
pub use vector::{VectorSink, VectorWriter};
