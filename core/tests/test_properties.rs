#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use streamseal_core::compression::CompressionCodec;
    use streamseal_core::stream::{
        decrypt_stream, encrypt_stream, CancelToken, InputSource, MemorySink, OutputSink,
        PipelineConfig,
    };

    fn codec_strategy() -> impl Strategy<Value = CompressionCodec> {
        prop_oneof![
            Just(CompressionCodec::None),
            Just(CompressionCodec::Gzip),
            Just(CompressionCodec::Zstd),
        ]
    }

    fn encrypt(data: &[u8], chunk_size: usize, codec: CompressionCodec, seed: u64) -> (Vec<u8>, streamseal_core::crypto::CipherKeyMaterial) {
        let (sink, buf) = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = encrypt_stream(
            InputSource::from(data.to_vec()),
            OutputSink::Memory(sink),
            &mut rng,
            &PipelineConfig::new(chunk_size, codec),
            CancelToken::new(),
        )
        .unwrap();
        (buf.bytes(), outcome.key_material)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_decrypt_inverts_encrypt(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            chunk_size in 1usize..300,
            codec in codec_strategy(),
            seed in any::<u64>(),
        ) {
            let (ct, keys) = encrypt(&data, chunk_size, codec, seed);
            prop_assert_eq!(ct.len() % 16, 0);

            let (sink, buf) = MemorySink::new();
            decrypt_stream(
                InputSource::from(ct),
                OutputSink::Memory(sink),
                &keys,
                &PipelineConfig::new(chunk_size, codec),
                CancelToken::new(),
            )
            .unwrap();
            prop_assert_eq!(buf.bytes(), data);
        }

        #[test]
        fn prop_ciphertext_independent_of_chunking(
            data in proptest::collection::vec(any::<u8>(), 1..512),
            a in 1usize..600,
            b in 1usize..600,
            codec in codec_strategy(),
            seed in any::<u64>(),
        ) {
            let (ct_a, _) = encrypt(&data, a, codec, seed);
            let (ct_b, _) = encrypt(&data, b, codec, seed);
            if codec == CompressionCodec::None {
                prop_assert_eq!(ct_a.len(), (data.len() / 16 + 1) * 16);
            }
            prop_assert_eq!(ct_a, ct_b);
        }
    }
}
