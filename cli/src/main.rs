//! streamseal CLI
//!
//! Compress-then-encrypt files with AES-256-CBC, and reverse it.
//!
//! - Output is written to `<out>.partial` and renamed only on success.
//! - The key and IV land in a JSON key file (default `<out>.key.json`).

mod keyfile;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::rngs::OsRng;
use tracing::{debug, info, warn};

use streamseal_core::compression::CompressionCodec;
use streamseal_core::constants::ALLOWED_CHUNK_SIZES;
use streamseal_core::stream::core::build_encrypt_pipeline;
use streamseal_core::stream::io::{open_input, open_output};
use streamseal_core::stream::{decrypt_stream, CancelToken, InputSource, OutputSink, PipelineConfig};
use streamseal_core::telemetry::TelemetrySnapshot;

use keyfile::{default_key_path, KeyFile};

/// streamseal - chunked compress-then-encrypt pipeline
#[derive(Parser)]
#[command(name = "streamseal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output (implies --verbose)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress and encrypt a file
    Encrypt {
        #[command(flatten)]
        io: IoArgs,

        /// Compression codec: gzip, zstd or none
        #[arg(long)]
        codec: Option<CompressionCodec>,

        /// Codec level (gzip 0-9, zstd 1-22)
        #[arg(long)]
        level: Option<i32>,

        /// Where to write the key file (default: <output>.key.json)
        #[arg(short, long)]
        key_file: Option<PathBuf>,
    },

    /// Decrypt and decompress a file produced by `encrypt`
    Decrypt {
        #[command(flatten)]
        io: IoArgs,

        /// Key file written by `encrypt`
        #[arg(short, long, required = true)]
        key_file: PathBuf,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input file
    #[arg(short, long, required = true)]
    input: PathBuf,

    /// Output file
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Maximum bytes per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// JSON pipeline config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write output from a dedicated writer thread
    #[arg(long)]
    threaded: bool,
}

impl IoArgs {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(size) = self.chunk_size {
            if !ALLOWED_CHUNK_SIZES.contains(&size) {
                debug!(chunk_size = size, "chunk size is not one of the presets");
            }
            config.chunk_size = size;
        }
        if self.threaded {
            config.threaded_sink = true;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Commands::Encrypt { io, codec, level, key_file } => {
            let mut config = io.pipeline_config()?;
            if let Some(codec) = codec {
                config.codec = codec;
            }
            if level.is_some() {
                config.level = level;
            }
            let key_path = key_file.unwrap_or_else(|| default_key_path(&io.output));
            encrypt_file(&io.input, &io.output, &key_path, &config)?;
        }
        Commands::Decrypt { io, key_file } => {
            let config = io.pipeline_config()?;
            decrypt_file(&io.input, &io.output, &key_file, config)?;
        }
    }

    Ok(())
}

fn encrypt_file(input: &Path, output: &Path, key_path: &Path, config: &PipelineConfig) -> anyhow::Result<()> {
    ensure_input(input)?;
    config.validate()?;

    let source = open_input(InputSource::File(input.to_path_buf()), config.chunk_size)?;
    let sink = open_output(OutputSink::File(output.to_path_buf()), config.threaded_sink)?;
    let (mut pipeline, key_material) =
        build_encrypt_pipeline(source, sink, &mut OsRng, config, CancelToken::new())?;

    // The key goes to disk before any ciphertext is committed. Dropping the
    // pipeline on failure aborts the sink and leaves only the partial file.
    KeyFile::new(&key_material, config.codec).save(key_path)?;
    info!(key_file = %key_path.display(), "key material written");

    let snapshot = match pipeline.run() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            if let Err(rm) = fs::remove_file(key_path) {
                warn!(key_file = %key_path.display(), error = %rm, "could not remove key file");
            }
            return Err(e).with_context(|| format!("Encryption of {} failed", input.display()));
        }
    };

    report("encrypted", output, &snapshot);
    println!("key file: {}", key_path.display());
    Ok(())
}

fn decrypt_file(input: &Path, output: &Path, key_path: &Path, mut config: PipelineConfig) -> anyhow::Result<()> {
    ensure_input(input)?;

    let keys = KeyFile::load(key_path)?;
    let material = keys.material()?;
    config.codec = keys.codec;
    config.level = None;

    let snapshot = decrypt_stream(
        InputSource::File(input.to_path_buf()),
        OutputSink::File(output.to_path_buf()),
        &material,
        &config,
        CancelToken::new(),
    )
    .with_context(|| format!("Decryption of {} failed", input.display()))?;

    report("decrypted", output, &snapshot);
    Ok(())
}

fn ensure_input(input: &Path) -> anyhow::Result<()> {
    if !input.is_file() {
        anyhow::bail!("File not found: {input:?}");
    }
    Ok(())
}

fn report(action: &str, output: &Path, snapshot: &TelemetrySnapshot) {
    println!("{action} -> {}", output.display());
    println!("{}", snapshot.summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_key_file_leaves_output_uncommitted() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.txt");
        let output = dir.path().join("sealed.bin");
        fs::write(&input, b"keep the key with the ciphertext").unwrap();
        let key_path = dir.path().join("missing").join("sealed.key.json");

        let config = PipelineConfig::new(8, CompressionCodec::Gzip);
        assert!(encrypt_file(&input, &output, &key_path, &config).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn encrypt_then_decrypt_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.txt");
        let sealed = dir.path().join("sealed.bin");
        let restored = dir.path().join("restored.txt");
        let data = b"file round trip through the command layer ".repeat(200);
        fs::write(&input, &data).unwrap();
        let key_path = default_key_path(&sealed);

        let config = PipelineConfig::new(1024, CompressionCodec::Zstd);
        encrypt_file(&input, &sealed, &key_path, &config).unwrap();
        assert!(key_path.exists());

        decrypt_file(&sealed, &restored, &key_path, PipelineConfig::default()).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), data);
    }
}
