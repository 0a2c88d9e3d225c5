#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use streamseal_core::stream::chunk::{concat_chunks, Chunk, ChunkSequencer};
    use streamseal_core::stream::io::{open_input, open_output};
    use streamseal_core::stream::sink::partial_path;
    use streamseal_core::stream::{
        ChunkSink, ChunkSource, FileSink, InputSource, MemorySink, MemorySource, OutputSink,
        ReaderSource, SinkState, WriterSink,
    };
    use streamseal_core::types::{PipelineError, SinkError, SourceError};

    /// Reader handing out at most `step` bytes per call, with an interrupt
    /// thrown in on the first read.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupted: bool,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn drain(source: &mut dyn ChunkSource) -> Vec<Chunk> {
        let mut out = Vec::new();
        loop {
            let c = source.next_chunk().unwrap();
            if c.is_terminal() {
                return out;
            }
            out.push(c);
        }
    }

    #[test]
    fn sequencer_numbers_and_terminal_marker() {
        let mut seq = ChunkSequencer::new();
        let a = seq.emit(b"a".to_vec());
        let b = seq.emit(b"bc".to_vec());
        assert_eq!((a.seq(), b.seq()), (0, 1));

        let end = seq.end_of_stream();
        assert!(end.is_terminal() && end.is_empty());
        assert_eq!(end.seq(), 2);
        assert_eq!(seq.end_of_stream().seq(), 2);
        assert_eq!(concat_chunks(&[a, b]), b"abc");
    }

    #[test]
    fn reader_source_fills_chunks_across_short_reads() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let reader = TrickleReader { data: data.clone(), pos: 0, step: 7, interrupted: false };
        let mut source = ReaderSource::new(reader, 64).unwrap();

        let chunks = drain(&mut source);
        assert_eq!(chunks.len(), 16);
        assert!(chunks[..15].iter().all(|c| c.len() == 64));
        assert_eq!(chunks[15].len(), 1000 - 15 * 64);
        assert_eq!(concat_chunks(&chunks), data);
        assert!(chunks.windows(2).all(|w| w[1].seq() == w[0].seq() + 1));

        // A drained source keeps answering end-of-stream.
        assert!(source.next_chunk().unwrap().is_terminal());
        assert!(source.next_chunk().unwrap().is_terminal());
    }

    #[test]
    fn closed_sources_refuse_reads() {
        let mut source = ReaderSource::new(io::Cursor::new(vec![1u8; 10]), 4).unwrap();
        source.close();
        assert!(matches!(source.next_chunk(), Err(SourceError::Closed)));

        let mut source = MemorySource::new(vec![1u8; 10], 4).unwrap();
        source.next_chunk().unwrap();
        source.close();
        assert!(matches!(source.next_chunk(), Err(SourceError::Closed)));
    }

    #[test]
    fn reader_errors_surface_unchanged() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            }
        }
        let mut source = ReaderSource::new(Broken, 8).unwrap();
        match source.next_chunk() {
            Err(SourceError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(MemorySource::new(vec![1u8], 0), Err(PipelineError::Config(_))));
        assert!(matches!(
            open_input(InputSource::from(vec![1u8]), 0),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn memory_source_slices_without_gaps() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut source = open_input(InputSource::from(data.clone()), 30).unwrap();
        let chunks = drain(source.as_mut());
        let lens: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(lens, vec![30, 30, 30, 10]);
        assert_eq!(concat_chunks(&chunks), data);
    }

    #[test]
    fn writer_sink_states() {
        let mut sink = WriterSink::new(Vec::new());
        sink.accept(Chunk::new(0, b"abc".to_vec())).unwrap();
        assert_eq!(sink.state(), SinkState::Open);
        sink.finish().unwrap();
        assert_eq!(sink.state(), SinkState::Complete);
        assert!(matches!(sink.accept(Chunk::new(1, b"x".to_vec())), Err(SinkError::Closed)));

        let mut sink = WriterSink::new(Vec::new());
        sink.abort();
        assert_eq!(sink.state(), SinkState::Incomplete);
    }

    #[test]
    fn file_sink_commits_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut sink = FileSink::create(&path).unwrap();
        assert_eq!(sink.partial_path(), partial_path(&path));

        sink.accept(Chunk::new(0, b"hello ".to_vec())).unwrap();
        sink.accept(Chunk::new(1, b"world".to_vec())).unwrap();
        assert!(!path.exists());

        sink.finish().unwrap();
        assert_eq!(sink.state(), SinkState::Complete);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn file_sink_abort_keeps_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut sink = FileSink::create(&path).unwrap();
        sink.accept(Chunk::new(0, b"half".to_vec())).unwrap();
        sink.abort();

        assert_eq!(sink.state(), SinkState::Incomplete);
        assert!(!path.exists());
        assert_eq!(std::fs::read(partial_path(&path)).unwrap(), b"half");
    }

    #[test]
    fn memory_sink_shares_output() {
        let (mut sink, buf) = MemorySink::new();
        sink.accept(Chunk::new(0, b"ab".to_vec())).unwrap();
        sink.accept(Chunk::new(1, b"cd".to_vec())).unwrap();
        assert_eq!(buf.bytes(), b"abcd");
        assert_eq!(buf.chunks(), 2);
        assert_eq!(buf.state(), SinkState::Open);

        sink.finish().unwrap();
        assert_eq!(buf.state(), SinkState::Complete);
        assert!(matches!(sink.accept(Chunk::new(2, b"e".to_vec())), Err(SinkError::Closed)));
        assert!(matches!(sink.finish(), Err(SinkError::Closed)));
    }

    #[test]
    fn open_output_can_wrap_in_writer_thread() {
        let (inner, buf) = MemorySink::new();
        let mut sink = open_output(OutputSink::Memory(inner), true).unwrap();
        sink.accept(Chunk::new(0, b"threaded".to_vec())).unwrap();
        sink.finish().unwrap();
        assert_eq!(buf.bytes(), b"threaded");
        assert_eq!(buf.state(), SinkState::Complete);
    }
}
