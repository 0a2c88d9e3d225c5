#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use streamseal_core::compression::CompressionCodec;
    use streamseal_core::stream::chunk::Chunk;
    use streamseal_core::stream::core::build_encrypt_pipeline;
    use streamseal_core::stream::{
        CancelToken, ChunkSink, ChunkSource, MemorySink, MemorySource, PassthroughStage, Pipeline,
        PipelineConfig, SharedBuffer, SinkState, ThreadedSink,
    };
    use streamseal_core::types::{SinkError, SourceError};

    /// Shared view of the flow between source and sink.
    #[derive(Default)]
    struct Flow {
        pulled: AtomicU64,
        accepted: AtomicU64,
        in_accept: AtomicBool,
        max_gap: AtomicU64,
        pulls_during_write: AtomicU64,
    }

    struct TrackingSource {
        inner: MemorySource,
        flow: Arc<Flow>,
    }

    impl ChunkSource for TrackingSource {
        fn next_chunk(&mut self) -> Result<Chunk, SourceError> {
            if self.flow.in_accept.load(Ordering::SeqCst) {
                self.flow.pulls_during_write.fetch_add(1, Ordering::SeqCst);
            }
            let chunk = self.inner.next_chunk()?;
            if !chunk.is_terminal() {
                let pulled = self.flow.pulled.fetch_add(1, Ordering::SeqCst) + 1;
                let gap = pulled.saturating_sub(self.flow.accepted.load(Ordering::SeqCst));
                self.flow.max_gap.fetch_max(gap, Ordering::SeqCst);
            }
            Ok(chunk)
        }

        fn close(&mut self) {
            self.inner.close();
        }
    }

    /// Sink that takes its time with every write.
    struct SlowSink {
        inner: MemorySink,
        flow: Arc<Flow>,
        delay: Duration,
    }

    impl ChunkSink for SlowSink {
        fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
            self.flow.in_accept.store(true, Ordering::SeqCst);
            thread::sleep(self.delay);
            let res = self.inner.accept(chunk);
            self.flow.accepted.fetch_add(1, Ordering::SeqCst);
            self.flow.in_accept.store(false, Ordering::SeqCst);
            res
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            self.inner.finish()
        }

        fn abort(&mut self) {
            self.inner.abort();
        }
    }

    fn tracked(data: Vec<u8>, chunk_size: usize) -> (TrackingSource, SlowSink, SharedBuffer, Arc<Flow>) {
        let flow = Arc::new(Flow::default());
        let (inner, buf) = MemorySink::new();
        let source = TrackingSource { inner: MemorySource::new(data, chunk_size).unwrap(), flow: flow.clone() };
        let sink = SlowSink { inner, flow: flow.clone(), delay: Duration::from_millis(2) };
        (source, sink, buf, flow)
    }

    #[test]
    fn slow_sink_limits_pulls_to_one_ahead() {
        let data = vec![7u8; 64 * 20];
        let (source, sink, buf, flow) = tracked(data.clone(), 64);

        let mut pipeline = Pipeline::builder(source, sink).stage(PassthroughStage::new()).build();
        pipeline.run().unwrap();

        assert_eq!(buf.bytes(), data);
        assert_eq!(flow.pulled.load(Ordering::SeqCst), 20);
        assert_eq!(flow.accepted.load(Ordering::SeqCst), 20);
        assert!(flow.max_gap.load(Ordering::SeqCst) <= 1);
        assert_eq!(flow.pulls_during_write.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn threaded_sink_waits_for_acknowledgment() {
        let data = vec![3u8; 100 * 15];
        let (source, sink, buf, flow) = tracked(data.clone(), 100);

        let sink = ThreadedSink::spawn(sink).unwrap();
        let mut pipeline = Pipeline::builder(source, sink).build();
        pipeline.run().unwrap();

        assert_eq!(buf.bytes(), data);
        assert_eq!(buf.state(), SinkState::Complete);
        assert!(flow.max_gap.load(Ordering::SeqCst) <= 1);
        assert_eq!(flow.pulls_during_write.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn encrypt_pipeline_never_pulls_during_a_write() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 97) as u8).collect();
        let (source, sink, buf, flow) = tracked(data, 1000);
        let config = PipelineConfig::new(1000, CompressionCodec::None);
        let mut rng = StdRng::seed_from_u64(31);

        let (mut pipeline, _keys) = build_encrypt_pipeline(
            Box::new(source),
            Box::new(ThreadedSink::spawn(sink).unwrap()),
            &mut rng,
            &config,
            CancelToken::new(),
        )
        .unwrap();
        let snap = pipeline.run().unwrap();

        assert_eq!(flow.pulls_during_write.load(Ordering::SeqCst), 0);
        // Each 1000-byte chunk completes at least one block, so delivery
        // keeps pace with pulls.
        assert!(flow.max_gap.load(Ordering::SeqCst) <= 1);
        assert_eq!(snap.bytes_out, buf.len() as u64);
        assert_eq!(buf.len(), 20_000 + 16);
    }

    #[test]
    fn threaded_sink_reports_inner_errors() {
        struct BrokenSink;
        impl ChunkSink for BrokenSink {
            fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
                Err(SinkError::Rejected { seq: chunk.seq(), reason: "read-only".into() })
            }
            fn finish(&mut self) -> Result<(), SinkError> {
                Ok(())
            }
            fn abort(&mut self) {}
        }

        let mut sink = ThreadedSink::spawn(BrokenSink).unwrap();
        let err = sink.accept(Chunk::new(4, b"data".to_vec())).unwrap_err();
        assert!(matches!(err, SinkError::Rejected { seq: 4, .. }));
        sink.abort();
        assert!(matches!(sink.accept(Chunk::new(5, b"more".to_vec())), Err(SinkError::Closed)));
    }

    #[test]
    fn dropping_threaded_sink_aborts_inner() {
        let (inner, buf) = MemorySink::new();
        let mut sink = ThreadedSink::spawn(inner).unwrap();
        sink.accept(Chunk::new(0, b"partial".to_vec())).unwrap();
        drop(sink);

        assert_eq!(buf.bytes(), b"partial");
        assert_eq!(buf.state(), SinkState::Incomplete);
    }
}
