//! stream/core.rs
//! Stable public API: compress-then-encrypt and its reverse.

use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::compression::{CompressionTransform, DecompressionTransform};
use crate::crypto::{BlockCipherTransform, BlockDecipherTransform, CipherContext, CipherKeyMaterial};
use crate::stream::cancel::CancelToken;
use crate::stream::config::PipelineConfig;
use crate::stream::io::{open_input, open_output, InputSource, OutputSink};
use crate::stream::pipeline::{Pipeline, PipelineBuilder};
use crate::stream::sink::ChunkSink;
use crate::stream::source::ChunkSource;
use crate::stream::stage::TransformStage;
use crate::telemetry::TelemetrySnapshot;
use crate::types::PipelineError;

/// Result of a successful encryption run.
#[derive(Debug)]
pub struct EncryptOutcome {
    /// Needed, together with the codec, to decrypt the output.
    pub key_material: CipherKeyMaterial,
    pub snapshot: TelemetrySnapshot,
}

/// Stages for `[compress] -> encrypt`, with a fresh key and IV. The exported
/// key material is returned; the cipher context moves into the cipher stage.
pub fn encrypt_stages<R>(
    rng: &mut R,
    config: &PipelineConfig,
) -> Result<(Vec<Box<dyn TransformStage>>, CipherKeyMaterial), PipelineError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    config.validate()?;
    let ctx = CipherContext::generate(rng)?;
    let key_material = ctx.key_material();

    let mut stages: Vec<Box<dyn TransformStage>> = Vec::with_capacity(2);
    if !config.codec.is_none() {
        let stage = CompressionTransform::new(config.codec, config.level)
            .map_err(|e| PipelineError::stage(0, "compress", e))?;
        stages.push(Box::new(stage));
    }
    stages.push(Box::new(BlockCipherTransform::new(ctx)));
    Ok((stages, key_material))
}

/// Stages for `decrypt -> [decompress]`.
pub fn decrypt_stages(
    key_material: &CipherKeyMaterial,
    config: &PipelineConfig,
) -> Result<Vec<Box<dyn TransformStage>>, PipelineError> {
    config.validate()?;

    let mut stages: Vec<Box<dyn TransformStage>> = Vec::with_capacity(2);
    stages.push(Box::new(BlockDecipherTransform::new(key_material)));
    if !config.codec.is_none() {
        let stage = DecompressionTransform::new(config.codec)
            .map_err(|e| PipelineError::stage(1, "decompress", e))?;
        stages.push(Box::new(stage));
    }
    Ok(stages)
}

/// Assemble `source -> [compress] -> encrypt -> sink`.
///
/// If the stages cannot be built, the source is closed and the sink aborted
/// before the error is returned.
pub fn build_encrypt_pipeline<R>(
    source: Box<dyn ChunkSource>,
    sink: Box<dyn ChunkSink>,
    rng: &mut R,
    config: &PipelineConfig,
    cancel: CancelToken,
) -> Result<(Pipeline, CipherKeyMaterial), PipelineError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let (stages, key_material) = match encrypt_stages(rng, config) {
        Ok(v) => v,
        Err(e) => return Err(release_endpoints(source, sink, e)),
    };
    Ok((assemble(source, sink, stages, cancel), key_material))
}

/// Assemble `source -> decrypt -> [decompress] -> sink`.
pub fn build_decrypt_pipeline(
    source: Box<dyn ChunkSource>,
    sink: Box<dyn ChunkSink>,
    key_material: &CipherKeyMaterial,
    config: &PipelineConfig,
    cancel: CancelToken,
) -> Result<Pipeline, PipelineError> {
    let stages = match decrypt_stages(key_material, config) {
        Ok(v) => v,
        Err(e) => return Err(release_endpoints(source, sink, e)),
    };
    Ok(assemble(source, sink, stages, cancel))
}

fn assemble(
    source: Box<dyn ChunkSource>,
    sink: Box<dyn ChunkSink>,
    stages: Vec<Box<dyn TransformStage>>,
    cancel: CancelToken,
) -> Pipeline {
    stages
        .into_iter()
        .fold(PipelineBuilder::from_boxed(source, sink).cancel_token(cancel), |b, s| b.boxed_stage(s))
        .build()
}

fn release_endpoints(
    mut source: Box<dyn ChunkSource>,
    mut sink: Box<dyn ChunkSink>,
    err: PipelineError,
) -> PipelineError {
    source.close();
    sink.abort();
    err
}

/// Encrypt `input` into `output`.
///
/// A new key and IV are drawn from `rng` for every call; retrying a failed
/// run therefore never reuses an IV.
pub fn encrypt_stream<R>(
    input: InputSource,
    output: OutputSink,
    rng: &mut R,
    config: &PipelineConfig,
    cancel: CancelToken,
) -> Result<EncryptOutcome, PipelineError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    config.validate()?;
    let (source, sink) = open_endpoints(input, output, config)?;

    let (mut pipeline, key_material) = build_encrypt_pipeline(source, sink, rng, config, cancel)?;
    info!(codec = %config.codec, chunk_size = config.chunk_size, "encrypting stream");
    let snapshot = pipeline.run()?;

    Ok(EncryptOutcome { key_material, snapshot })
}

/// Decrypt `input` into `output` with the material exported by a previous
/// `encrypt_stream` and the same codec.
pub fn decrypt_stream(
    input: InputSource,
    output: OutputSink,
    key_material: &CipherKeyMaterial,
    config: &PipelineConfig,
    cancel: CancelToken,
) -> Result<TelemetrySnapshot, PipelineError> {
    config.validate()?;
    let (source, sink) = open_endpoints(input, output, config)?;

    let mut pipeline = build_decrypt_pipeline(source, sink, key_material, config, cancel)?;
    info!(codec = %config.codec, chunk_size = config.chunk_size, "decrypting stream");
    pipeline.run()
}

fn open_endpoints(
    input: InputSource,
    output: OutputSink,
    config: &PipelineConfig,
) -> Result<(Box<dyn ChunkSource>, Box<dyn ChunkSink>), PipelineError> {
    let mut source = open_input(input, config.chunk_size)?;
    match open_output(output, config.threaded_sink) {
        Ok(sink) => Ok((source, sink)),
        Err(e) => {
            source.close();
            Err(e)
        }
    }
}
