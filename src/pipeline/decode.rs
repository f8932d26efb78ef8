//! SSE frame decoding (text chunks -> `data:` payload strings).

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for newline-delimited `data:` frames.
///
/// One decoder instance is bound to one stream and is never restartable.
/// It carries incomplete trailing data across arbitrary delivery boundaries,
/// so re-chunking the same byte stream yields identical frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: String,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal sentinel has been seen. Once set, no further
    /// input is consumed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one delivery of stream text and collect the complete frame
    /// payloads it unlocks (the substring after `data:`, trimmed).
    ///
    /// Blank lines, non-data lines (vendors interleave comments and event
    /// names) and empty payloads are skipped.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        self.buf.push_str(chunk);
        // Retain the final, possibly incomplete element as the new buffer.
        let mut lines: Vec<String> = self.buf.split('\n').map(str::to_string).collect();
        self.buf = lines.pop().unwrap_or_default();

        for line in lines {
            match self.accept(&line) {
                Some(payload) => frames.push(payload),
                None if self.done => break,
                None => continue,
            }
        }
        frames
    }

    /// Flush the trailing partial line at end of stream. Providers that omit
    /// the sentinel may end the body right after the last frame's newline is
    /// lost in transit.
    pub fn finish(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        self.accept(&line)
    }

    fn accept(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if !line.starts_with(DATA_PREFIX) {
            return None;
        }
        let payload = line[DATA_PREFIX.len()..].trim();
        if payload == DONE_SENTINEL {
            self.done = true;
            return None;
        }
        if payload.is_empty() {
            return None;
        }
        Some(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut FrameDecoder, chunks: &[&str]) -> Vec<String> {
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(decoder.push(chunk));
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn splits_frames_and_skips_noise() {
        let mut decoder = FrameDecoder::new();
        let frames = collect(
            &mut decoder,
            &["data: {\"a\":1}\n\n: keep-alive\nevent: ping\ndata: {\"b\":2}\n"],
        );
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(!decoder.is_done());
    }

    #[test]
    fn frame_split_across_deliveries_decodes_once() {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.push("data: {\"cho");
        frames.extend(decoder.push("ices\":[1]}\n"));
        assert_eq!(frames, vec!["{\"choices\":[1]}"]);
    }

    #[test]
    fn sentinel_ends_the_stream_and_drops_later_lines() {
        let mut decoder = FrameDecoder::new();
        let frames =
            decoder.push("data: {\"a\":1}\ndata: [DONE]\ndata: {\"late\":true}\n");
        assert_eq!(frames, vec!["{\"a\":1}"]);
        assert!(decoder.is_done());
        assert!(decoder.push("data: {\"more\":1}\n").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn finish_flushes_a_trailing_frame_without_newline() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push("data: {\"tail\":1}").is_empty());
        assert_eq!(decoder.finish(), Some("{\"tail\":1}".to_string()));
    }

    #[test]
    fn chunk_boundary_invariance() {
        let stream = "data: {\"a\":1}\n\ndata: {\"b\":2}\ndata: {\"c\":3}\ndata: [DONE]\n";
        let mut whole = FrameDecoder::new();
        let expected = collect(&mut whole, &[stream]);
        assert_eq!(expected.len(), 3);

        for split_at in 0..=stream.len() {
            let (left, right) = stream.split_at(split_at);
            let mut decoder = FrameDecoder::new();
            let frames = collect(&mut decoder, &[left, right]);
            assert_eq!(frames, expected, "split at byte {}", split_at);
        }
    }
}
