/// Defaults when `Option<T>` is None
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Smallest chunk cap a source accepts. One byte is legal: chunking must never
/// be observable in the output.
pub const MIN_CHUNK_SIZE: usize = 1;

/// Max chunk size sanity bound (32 MiB).
pub const MAX_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Industry-standard chunk sizes (in bytes), offered by the CLI as presets.
pub const ALLOWED_CHUNK_SIZES: &[usize] = &[
    16 * 1024,   // 16 KiB
    32 * 1024,   // 32 KiB
    64 * 1024,   // 64 KiB
    128 * 1024,  // 128 KiB
    256 * 1024,  // 256 KiB
    1024 * 1024, // 1 MiB
];

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-256 key length.
pub const KEY_LEN_32: usize = 32;

/// CBC initialization vector length (one block).
pub const IV_LEN_16: usize = BLOCK_SIZE;

/// Capacity of the hand-off channel used by the threaded sink. One slot keeps
/// at most a single unacknowledged write in flight.
pub const THREADED_SINK_QUEUE_CAP: usize = 1;

/// Suffix of sink files that have not been committed yet.
pub const PARTIAL_SUFFIX: &str = "partial";
