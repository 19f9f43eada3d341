//! Service implementations.

pub mod memory;

pub use memory::{InMemoryBlobStorage, InMemoryQueueService};
