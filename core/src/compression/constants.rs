/// Stable codec IDs (u16) used in config files and key files.
pub mod codec_ids {
    pub const NONE: u16 = 0x0000;
    pub const GZIP: u16 = 0x0001;
    pub const ZSTD: u16 = 0x0002;
}

/// Default compression levels (balanced).
pub const DEFAULT_LEVEL_GZIP: i32 = 6;
pub const DEFAULT_LEVEL_ZSTD: i32 = 6;

/// Accepted level ranges per codec.
pub const GZIP_LEVELS: std::ops::RangeInclusive<i32> = 0..=9;
pub const ZSTD_LEVELS: std::ops::RangeInclusive<i32> = 1..=22;
