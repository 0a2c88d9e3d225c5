//! stream/config.rs
//! Run configuration shared by the library façade and the CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compression::{validate_level, CompressionCodec};
use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::stream::source::validate_chunk_size;
use crate::types::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum bytes per source chunk.
    pub chunk_size: usize,

    /// Compression applied before encryption. `none` skips the stage.
    pub codec: CompressionCodec,

    /// Codec level; `None` uses the codec default.
    pub level: Option<i32>,

    /// Hand sink writes to a dedicated writer thread (still one outstanding
    /// write at a time).
    pub threaded_sink: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            codec: CompressionCodec::Gzip,
            level: None,
            threaded_sink: false,
        }
    }
}

impl PipelineConfig {
    pub fn new(chunk_size: usize, codec: CompressionCodec) -> Self {
        Self { chunk_size, codec, ..Self::default() }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_threaded_sink(mut self, threaded: bool) -> Self {
        self.threaded_sink = threaded;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_chunk_size(self.chunk_size)?;
        validate_level(self.codec, self.level)?;
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| PipelineError::Config(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&text)
    }
}
