//! Pull-based audio decoding sessions.
//!
//! A [`DecodeSession`] loads a whole file into memory, hands it to a decoder
//! engine, and serves interleaved little-endian PCM on demand while keeping
//! a millisecond position cursor. Tags are edited separately through
//! [`engine::metadata::MetadataStore`].

pub mod engine;

pub use engine::{BitDepth, DecodeSession, DecoderConfig, ErrorKind, SessionError, SessionState};
