//! compression/codecs/mod.rs
//! Streaming codec adapters over external compressors.

pub mod gzip;
pub mod zstd;

pub use self::gzip::*;
pub use self::zstd::*;
