//! Key file written next to encrypted output.
//!
//! JSON with hex key and IV plus the codec needed to undo compression.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use streamseal_core::compression::CompressionCodec;
use streamseal_core::crypto::CipherKeyMaterial;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyFile {
    pub codec: CompressionCodec,
    pub key: String,
    pub iv: String,
}

impl KeyFile {
    pub fn new(material: &CipherKeyMaterial, codec: CompressionCodec) -> Self {
        Self { codec, key: material.key_hex(), iv: material.iv_hex() }
    }

    pub fn material(&self) -> anyhow::Result<CipherKeyMaterial> {
        CipherKeyMaterial::from_hex(&self.key, &self.iv).context("Invalid key material in key file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;
        let parsed = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse key file {}", path.display()));
        text.zeroize();
        parsed
    }

    /// Write the key file, readable by the owner only on unix.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut text = serde_json::to_string_pretty(self)?;
        let res = write_private(path, text.as_bytes())
            .with_context(|| format!("Failed to write key file {}", path.display()));
        text.zeroize();
        res
    }
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    // `mode` only applies on creation; tighten an existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// `<output>.key.json`
pub fn default_key_path(output: &Path) -> PathBuf {
    let mut s = output.as_os_str().to_owned();
    s.push(".key.json");
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_restores_material() {
        let material = CipherKeyMaterial::from_slices(&[7u8; 32], &[9u8; 16]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = default_key_path(&dir.path().join("out.bin"));
        assert!(path.ends_with("out.bin.key.json"));

        KeyFile::new(&material, CompressionCodec::Zstd).save(&path).unwrap();
        let loaded = KeyFile::load(&path).unwrap();
        assert_eq!(loaded.codec, CompressionCodec::Zstd);
        let restored = loaded.material().unwrap();
        assert_eq!(restored.key(), material.key());
        assert_eq!(restored.iv(), material.iv());
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let material = CipherKeyMaterial::from_slices(&[1u8; 32], &[2u8; 16]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.json");
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        KeyFile::new(&material, CompressionCodec::Gzip).save(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(KeyFile::load(&path).is_ok());
    }

    #[test]
    fn rejects_unknown_fields_and_short_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.json");
        fs::write(&path, r#"{"codec":"gzip","key":"00","iv":"00","extra":1}"#).unwrap();
        assert!(KeyFile::load(&path).is_err());

        fs::write(&path, r#"{"codec":"gzip","key":"00","iv":"00"}"#).unwrap();
        assert!(KeyFile::load(&path).unwrap().material().is_err());
    }
}
