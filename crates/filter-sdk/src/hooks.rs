//! Optional phase callbacks registered by an extension.

use filter_core::{Action, Direction};
use filter_observability::Log;

use crate::ExchangeContext;

/// Called when request or response headers are available.
pub type HeadersHook<C> = Box<dyn Fn(&mut ExchangeContext<C>, &C, &Log) -> Action>;

/// Called once with the whole body at end of stream.
pub type BodyHook<C> = Box<dyn Fn(&mut ExchangeContext<C>, &C, &[u8], &Log) -> Action>;

/// Called with every body chunk; the returned bytes replace the chunk.
pub type StreamingBodyHook<C> =
    Box<dyn Fn(&mut ExchangeContext<C>, &C, &[u8], bool, &Log) -> Vec<u8>>;

/// Called once when the exchange finishes.
pub type StreamDoneHook<C> = Box<dyn Fn(&mut ExchangeContext<C>, &C, &Log)>;

/// The set of callbacks an extension registered.
///
/// Dispatch is driven purely by which entries are present.
pub struct Hooks<C> {
    pub request_headers: Option<HeadersHook<C>>,
    pub request_body: Option<BodyHook<C>>,
    pub streaming_request_body: Option<StreamingBodyHook<C>>,
    pub response_headers: Option<HeadersHook<C>>,
    pub response_body: Option<BodyHook<C>>,
    pub streaming_response_body: Option<StreamingBodyHook<C>>,
    pub stream_done: Option<StreamDoneHook<C>>,
}

impl<C> Default for Hooks<C> {
    fn default() -> Self {
        Self {
            request_headers: None,
            request_body: None,
            streaming_request_body: None,
            response_headers: None,
            response_body: None,
            streaming_response_body: None,
            stream_done: None,
        }
    }
}

impl<C> Hooks<C> {
    /// Header hook for a direction.
    pub fn headers(&self, direction: Direction) -> Option<&HeadersHook<C>> {
        match direction {
            Direction::Request => self.request_headers.as_ref(),
            Direction::Response => self.response_headers.as_ref(),
        }
    }

    /// Whole-body hook for a direction.
    pub fn body(&self, direction: Direction) -> Option<&BodyHook<C>> {
        match direction {
            Direction::Request => self.request_body.as_ref(),
            Direction::Response => self.response_body.as_ref(),
        }
    }

    /// Streaming-body hook for a direction.
    pub fn streaming_body(&self, direction: Direction) -> Option<&StreamingBodyHook<C>> {
        match direction {
            Direction::Request => self.streaming_request_body.as_ref(),
            Direction::Response => self.streaming_response_body.as_ref(),
        }
    }

    /// Whether any body hook is registered for a direction.
    pub fn reads_body(&self, direction: Direction) -> bool {
        self.body(direction).is_some() || self.streaming_body(direction).is_some()
    }

    /// Whether a streaming hook is registered for a direction.
    pub fn streams_body(&self, direction: Direction) -> bool {
        self.streaming_body(direction).is_some()
    }
}
