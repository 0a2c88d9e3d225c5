//! streamseal-core
//!
//! Pure Rust chunked compress-then-encrypt pipeline.
//! No FFI, no async runtime.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;

// Transform stages
pub mod compression;
pub mod crypto;
pub mod telemetry;

// Pipeline layer
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::compression::CompressionCodec;
    pub use crate::crypto::CipherKeyMaterial;
    pub use crate::stream::{
        decrypt_stream, encrypt_stream, CancelToken, EncryptOutcome, InputSource, OutputSink,
        PipelineConfig,
    };
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::PipelineError;
}
