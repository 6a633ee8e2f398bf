//! Newline framing over a chunked byte stream

use tracing::debug;

/// Accumulates bytes and yields complete lines.
///
/// Data after the last `\n` stays buffered until more bytes arrive. A
/// trailing `\r` is stripped; blank lines are skipped. Lines that are not
/// valid UTF-8 are returned lossily so the JSON parser rejects them.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let mut line = &self.buf[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line);
            if !line.trim().is_empty() {
                lines.push(line.into_owned());
            }
            start = end + 1;
        }
        self.buf.drain(..start);
        lines
    }

    /// Bytes received after the last newline.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any unterminated tail at end of input.
    pub fn finish(&mut self) {
        if !self.buf.is_empty() {
            debug!("Discarding {} bytes of unterminated input", self.buf.len());
            self.buf.clear();
        }
    }
}
