use crate::config::ChunkPolicy;
use crate::error::{ChunkerError, Result};
use crate::traversal::{ChunkExtractor, ExtractOptions};
use crate::types::{chunk_id, Chunk};
use std::collections::{HashSet, VecDeque};
use std::io::Read;
use tree_sitter::Tree;

/// Default streaming window: 1 MiB
pub const DEFAULT_WINDOW_SIZE: usize = 1024 * 1024;

/// Parses one accumulated source window.
///
/// Parsing stays outside the engine; implement this for whatever builds the
/// trees. The obvious implementation is [`tree_sitter::Parser`].
pub trait WindowParser {
    /// Parse a window of source, returning `None` on parser failure
    fn parse_window(&mut self, source: &str) -> Option<Tree>;
}

impl WindowParser for tree_sitter::Parser {
    fn parse_window(&mut self, source: &str) -> Option<Tree> {
        self.parse(source, None)
    }
}

/// Drives the traversal engine over a source too large to parse whole.
///
/// The source is read in windows into an accumulating buffer. Once the
/// buffer exceeds twice the window size it is parsed and chunked like any
/// other tree, then trimmed to keep a tail of context for the next round.
/// Chunks whose byte range reaches into that tail are deferred (the trim
/// never cuts past the start of a deferred chunk, so a boundary-straddling
/// chunk is re-seen whole later), and a set of already-emitted spans keeps
/// the re-parsed tail from emitting anything twice. The union of chunks
/// across all windows therefore matches chunking the whole source in one
/// pass.
#[derive(Debug, Clone, Copy)]
pub struct StreamingChunker {
    window_size: usize,
    options: ExtractOptions,
}

impl StreamingChunker {
    /// Create a streaming chunker with the default window size and size
    /// filters
    #[must_use]
    pub fn new() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            options: ExtractOptions::default(),
        }
    }

    /// Builder: set the window size in bytes
    #[must_use]
    pub const fn with_window_size(mut self, bytes: usize) -> Self {
        self.window_size = bytes;
        self
    }

    /// Builder: set the traversal size filters
    #[must_use]
    pub const fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Stream chunks from `reader` as a lazy, finite, forward-only sequence.
    ///
    /// Restart by invoking again on a fresh reader over the same source.
    pub fn chunks<'p, R: Read, P: WindowParser>(
        &self,
        reader: R,
        parser: P,
        policy: &'p dyn ChunkPolicy,
        file_path: impl Into<String>,
    ) -> ChunkStream<'p, R, P> {
        ChunkStream {
            reader,
            parser,
            policy,
            options: self.options,
            file_path: file_path.into(),
            window_size: self.window_size.max(1),
            buffer: Vec::new(),
            base_offset: 0,
            base_line: 0,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            finished: false,
        }
    }
}

impl Default for StreamingChunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull-based iterator over the chunks of a streamed source
pub struct ChunkStream<'p, R, P> {
    reader: R,
    parser: P,
    policy: &'p dyn ChunkPolicy,
    options: ExtractOptions,
    file_path: String,
    window_size: usize,
    buffer: Vec<u8>,
    /// Absolute byte offset of the first buffered byte
    base_offset: usize,
    /// Newlines consumed before the first buffered byte
    base_line: usize,
    pending: VecDeque<Chunk>,
    seen: HashSet<(usize, usize, String)>,
    finished: bool,
}

impl<R: Read, P: WindowParser> Iterator for ChunkStream<'_, R, P> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            if self.finished {
                return None;
            }
            if let Err(e) = self.advance() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

impl<R: Read, P: WindowParser> ChunkStream<'_, R, P> {
    /// Read one more window and process the buffer when it is due
    fn advance(&mut self) -> Result<()> {
        let read = (&mut self.reader)
            .take(self.window_size as u64)
            .read_to_end(&mut self.buffer)?;

        if read < self.window_size {
            self.process_buffer(true)?;
            self.finished = true;
        } else if self.buffer.len() >= self.window_size * 2 {
            self.process_buffer(false)?;
        }
        Ok(())
    }

    fn process_buffer(&mut self, at_eof: bool) -> Result<()> {
        let (mut chunks, text_len) = {
            let text = match std::str::from_utf8(&self.buffer) {
                Ok(text) => text,
                // A window boundary may split a multi-byte character; parse
                // the valid prefix and leave the rest for the next round.
                Err(e) if !at_eof && e.error_len().is_none() => {
                    std::str::from_utf8(&self.buffer[..e.valid_up_to()])
                        .expect("checked prefix is valid UTF-8")
                }
                Err(e) => {
                    return Err(ChunkerError::parse(format!(
                        "source is not valid UTF-8 near byte {}",
                        self.base_offset + e.valid_up_to()
                    )))
                }
            };

            if text.is_empty() {
                self.buffer.clear();
                return Ok(());
            }

            let tree = self
                .parser
                .parse_window(text)
                .ok_or_else(|| ChunkerError::parse("window parse failed"))?;
            let extractor = ChunkExtractor::with_options(self.policy, self.options);
            (
                extractor.extract(text, tree.root_node(), &self.file_path),
                text.len(),
            )
        };

        // Rebase window-relative coordinates to absolute ones. The buffer
        // always starts at a line boundary, so row offsets stay exact.
        for chunk in &mut chunks {
            chunk.byte_start += self.base_offset;
            chunk.byte_end += self.base_offset;
            chunk.start_line += self.base_line;
            chunk.end_line += self.base_line;
            chunk.chunk_id = chunk_id(
                &chunk.file_path,
                chunk.byte_start,
                chunk.byte_end,
                &chunk.node_type,
            );
        }

        if at_eof {
            for chunk in chunks {
                self.emit(chunk);
            }
            self.buffer.clear();
            return Ok(());
        }

        // Everything before the retained tail is final. The first chunk
        // reaching into the tail, and everything after it, waits for more
        // bytes; trimming never passes its start, so it is re-seen whole.
        let tail_start = text_len.saturating_sub(self.window_size);
        let safe_end = self.base_offset + tail_start;
        let defer_from = chunks
            .iter()
            .filter(|c| c.byte_end > safe_end)
            .map(|c| c.byte_start)
            .min();

        let mut deferred = 0usize;
        for chunk in chunks {
            if chunk.byte_start < defer_from.unwrap_or(usize::MAX) {
                self.emit(chunk);
            } else {
                deferred += 1;
            }
        }

        let cut = match defer_from {
            Some(start) => (start - self.base_offset).min(tail_start),
            None => tail_start,
        };
        // Keep the buffer aligned to a line start for exact line numbers.
        let cut = self.buffer[..cut]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);

        self.base_line += self.buffer[..cut].iter().filter(|&&b| b == b'\n').count();
        self.base_offset += cut;
        self.buffer.drain(..cut);

        log::debug!(
            "processed window up to byte {}: {deferred} chunk(s) deferred",
            self.base_offset
        );
        Ok(())
    }

    fn emit(&mut self, chunk: Chunk) {
        let span = (chunk.byte_start, chunk.byte_end, chunk.node_type.clone());
        if self.seen.insert(span) {
            self.pending.push_back(chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageConfig;
    use pretty_assertions::assert_eq;

    fn python_parser() -> tree_sitter::Parser {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("python grammar loads");
        parser
    }

    fn python_defs() -> LanguageConfig {
        LanguageConfig::builder("python")
            .chunk_types(["function_definition", "class_definition"])
            .build()
            .expect("valid config")
    }

    fn generate_source(functions: usize) -> String {
        let mut source = String::new();
        for i in 0..functions {
            if i % 7 == 0 {
                source.push_str(&format!("class Group{i}:\n"));
                source.push_str(&format!("    def method_{i}(self):\n"));
                source.push_str("        return None\n\n");
            }
            source.push_str(&format!("def fn_{i}(x):\n"));
            for line in 0..(1 + (i * 3) % 17) {
                source.push_str(&format!("    v{line} = x + {line}\n"));
            }
            source.push_str("    return x\n\n");
        }
        source
    }

    fn direct_chunks(config: &LanguageConfig, source: &str) -> Vec<Chunk> {
        let tree = python_parser().parse(source, None).expect("source parses");
        ChunkExtractor::new(config).extract(source, tree.root_node(), "big.py")
    }

    fn streamed_chunks(config: &LanguageConfig, source: &str, window: usize) -> Vec<Chunk> {
        StreamingChunker::new()
            .with_window_size(window)
            .chunks(source.as_bytes(), python_parser(), config, "big.py")
            .collect::<Result<Vec<_>>>()
            .expect("streaming succeeds")
    }

    #[test]
    fn small_input_is_a_single_window() {
        let config = python_defs();
        let source = "def f():\n    return 1\n";

        let streamed = streamed_chunks(&config, source, 1024 * 1024);
        assert_eq!(streamed, direct_chunks(&config, source));
        assert_eq!(streamed.len(), 1);
    }

    #[test]
    fn windowed_chunking_matches_single_pass() {
        let config = python_defs();
        let source = generate_source(80);
        // Small enough that the stream takes many rounds.
        let window = 1024;
        assert!(source.len() > 8 * window);

        let mut streamed = streamed_chunks(&config, &source, window);
        let mut direct = direct_chunks(&config, &source);

        streamed.sort_by_key(|c| (c.byte_start, c.byte_end));
        direct.sort_by_key(|c| (c.byte_start, c.byte_end));
        assert_eq!(streamed, direct);
    }

    #[test]
    fn no_span_is_emitted_twice() {
        let config = python_defs();
        let source = generate_source(40);
        let streamed = streamed_chunks(&config, &source, 512);

        let mut spans: Vec<_> = streamed
            .iter()
            .map(|c| (c.byte_start, c.byte_end, c.node_type.clone()))
            .collect();
        spans.sort();
        let before = spans.len();
        spans.dedup();
        assert_eq!(spans.len(), before);
    }

    #[test]
    fn stream_preserves_emission_order() {
        let config = python_defs();
        let source = generate_source(40);
        let streamed = streamed_chunks(&config, &source, 1024);

        let mut sorted = streamed.clone();
        sorted.sort_by_key(|c| (c.byte_start, c.byte_end));
        assert_eq!(sorted, streamed);
    }

    #[test]
    fn chunk_larger_than_the_window_survives() {
        let config = python_defs();
        let mut source = String::from("def huge(x):\n");
        for line in 0..300 {
            source.push_str(&format!("    v{line} = x + {line}\n"));
        }
        source.push_str("    return x\n\ndef tail():\n    return 0\n");

        let window = 256;
        assert!(source.len() > 10 * window);
        let streamed = streamed_chunks(&config, &source, window);
        let direct = direct_chunks(&config, &source);
        assert_eq!(streamed, direct);
        assert_eq!(streamed.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let config = python_defs();
        let streamed = streamed_chunks(&config, "", 1024);
        assert!(streamed.is_empty());
    }

    #[test]
    fn read_failures_surface_as_errors() {
        struct FailingReader;

        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk unplugged"))
            }
        }

        let config = python_defs();
        let mut stream =
            StreamingChunker::new().chunks(FailingReader, python_parser(), &config, "gone.py");

        let err = stream
            .next()
            .expect("one error item")
            .expect_err("read failure propagates");
        assert!(matches!(err, ChunkerError::IoError(_)));
        assert!(stream.next().is_none());
    }

    #[test]
    fn parser_failures_surface_as_errors() {
        struct RefusingParser;

        impl WindowParser for RefusingParser {
            fn parse_window(&mut self, _source: &str) -> Option<Tree> {
                None
            }
        }

        let config = python_defs();
        let mut stream = StreamingChunker::new().chunks(
            "def f():\n    pass\n".as_bytes(),
            RefusingParser,
            &config,
            "f.py",
        );

        let err = stream
            .next()
            .expect("one error item")
            .expect_err("parse failure propagates");
        assert!(matches!(err, ChunkerError::ParseError(_)));
    }
}
