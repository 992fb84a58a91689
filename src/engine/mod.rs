pub mod buffer;
pub mod clock;
pub mod config;
pub mod convert;
pub mod decoder;
pub mod dsp;
pub mod error;
pub mod metadata;
pub mod session;
pub mod source;

pub use clock::SessionState;
pub use config::{BitDepth, DecoderConfig, OutputFormat};
pub use error::{ErrorKind, Result, SessionError};
pub use session::DecodeSession;
