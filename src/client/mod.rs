//! Completion endpoint client and stream decoding
//!
//! - `api`: HTTP client and request body types
//! - `stream`: line-framed `data:` stream decoder

pub mod api;
pub mod stream;

pub use api::{ByteStream, CompletionBackend, CompletionClient, CompletionRequest};
pub use stream::{decode_stream, StreamDecoder, StreamRecord};
