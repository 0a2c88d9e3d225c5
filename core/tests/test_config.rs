#[cfg(test)]
mod tests {
    use streamseal_core::compression::CompressionCodec;
    use streamseal_core::constants::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
    use streamseal_core::stream::PipelineConfig;
    use streamseal_core::types::PipelineError;

    #[test]
    fn defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.codec, CompressionCodec::Gzip);
        assert_eq!(cfg.level, None);
        assert!(!cfg.threaded_sink);
        cfg.validate().unwrap();
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = PipelineConfig::from_json(r#"{ "codec": "zstd", "level": 19 }"#).unwrap();
        assert_eq!(cfg.codec, CompressionCodec::Zstd);
        assert_eq!(cfg.level, Some(19));
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn json_rejects_unknown_fields_and_codecs() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{ "chunk": 10 }"#),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{ "codec": "brotli" }"#),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn chunk_size_bounds() {
        assert!(PipelineConfig::new(1, CompressionCodec::None).validate().is_ok());
        assert!(PipelineConfig::new(MAX_CHUNK_SIZE, CompressionCodec::None).validate().is_ok());
        assert!(matches!(
            PipelineConfig::new(0, CompressionCodec::None).validate(),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::new(MAX_CHUNK_SIZE + 1, CompressionCodec::Gzip).validate(),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn level_must_fit_codec() {
        assert!(PipelineConfig::default().with_level(9).validate().is_ok());
        let err = PipelineConfig::default().with_level(12).validate().unwrap_err();
        assert!(err.to_string().contains("level 12"));
        assert!(PipelineConfig::new(64, CompressionCodec::None).with_level(1).validate().is_err());
    }

    #[test]
    fn serde_round_trip_and_file_load() {
        let cfg = PipelineConfig::new(4096, CompressionCodec::None).with_threaded_sink(true);
        let text = serde_json::to_string(&cfg).unwrap();
        assert!(text.contains(r#""codec":"none""#));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, &text).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), cfg);

        assert!(matches!(
            PipelineConfig::load(dir.path().join("missing.json")),
            Err(PipelineError::Config(_))
        ));
    }
}
