pub mod accessor;
pub mod client;
pub mod types;

pub use accessor::StreamAccessor;
pub use client::{HttpStreamsClient, StreamsTransport};
pub use types::{StreamQuery, StreamRecord};
