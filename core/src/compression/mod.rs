//! compression/mod.rs
//! Streaming compression stages.
//!
//! - Encoders carry their window across chunks; output is drained after every
//!   chunk and the trailer is produced once, at finalize.
//! - Registry resolves codec IDs to implementations.

pub mod constants;
pub mod types;
pub mod registry;
pub mod codecs;
pub mod stream;

pub use constants::*;
pub use types::*;
pub use registry::*;
pub use stream::{CompressionTransform, DecompressionTransform};
