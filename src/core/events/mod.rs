

pub mod base;
pub mod sink;

pub use base::{GraphBatch, Phase, StatusMessage, StreamMessage};
pub use sink::{ChannelSink, CollectingSink, JsonLinesSink, SinkError, StreamSink};
