//! HTTP front door for the SSE transport
//!
//! Provides the stream-open and message-post routes.

pub mod handlers;
