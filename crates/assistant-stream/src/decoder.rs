/// Incremental UTF-8 decoder.
///
/// Multi-byte sequences split across chunks are held back until the rest of
/// the sequence arrives. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decodes a chunk, keeping any incomplete trailing sequence for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_end = consumed + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_end]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + len;
                        }
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        out
    }

    /// Flushes an incomplete trailing sequence at end of input.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    /// Number of bytes waiting for the rest of a multi-byte sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Splits a chunked byte stream into newline-terminated text lines.
///
/// Lines are returned without the trailing `\n`. A line that has not been
/// terminated yet stays buffered until a later chunk completes it or
/// [`LineDecoder::finish`] is called.
#[derive(Debug, Default)]
pub struct LineDecoder {
    utf8: Utf8Decoder,
    buf: String,
}

impl LineDecoder {
    /// Feeds a chunk and returns every line it completed, in order.
    ///
    /// A chunk without a newline returns nothing and only grows the buffer.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        self.buf.push_str(&text);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=idx).collect();
            lines.push(line[..line.len() - 1].to_string());
        }
        lines
    }

    /// Returns the unterminated tail, if any, once the source is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.utf8.finish();
        self.buf.push_str(&rest);
        if self.buf.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buf))
    }
}
