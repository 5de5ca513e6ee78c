#[cfg(test)]
#[path = "assembler_test.rs"]
mod tests;

use std::fmt;
use std::str;

use futures::Stream;
use futures::StreamExt;

use crate::domain::models::AssembledAnswer;
use crate::domain::models::RequestFailed;
use crate::domain::models::END_OF_RESPONSE;
use crate::domain::models::INVALID_REQUEST_ERROR;
use crate::domain::models::SERVER_ERROR;

/// UTF-8 decoder that carries incomplete multi-byte sequences over to the
/// next call instead of replacing them.
#[derive(Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut decoded = String::new();
        let mut consumed = 0;
        loop {
            match str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_end = consumed + err.valid_up_to();
                    if let Ok(valid) = str::from_utf8(&self.pending[consumed..valid_end]) {
                        decoded.push_str(valid);
                    }
                    consumed = valid_end;

                    match err.error_len() {
                        Some(invalid_len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            consumed += invalid_len;
                        }
                        // Incomplete sequence at the end, wait for more bytes.
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        return decoded;
    }

    /// Flushes the decoder at end of stream. A sequence that never completed
    /// decodes to a single replacement character.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return "".to_string();
        }

        self.pending.clear();
        return char::REPLACEMENT_CHARACTER.to_string();
    }
}

/// Length of the longest suffix of `text` that could be the start of the end
/// of response marker.
fn sentinel_prefix_len(text: &str) -> usize {
    for len in (1..END_OF_RESPONSE.len()).rev() {
        if text.ends_with(&END_OF_RESPONSE[..len]) {
            return len;
        }
    }

    return 0;
}

/// Turns the raw byte chunks of one streamed answer into live text fragments
/// and one final classified answer. An assembler is consumed by a single
/// request.
#[derive(Default)]
pub struct StreamAssembler {
    decoder: Utf8StreamDecoder,
    text: String,
    forwarded: usize,
    ended: bool,
}

impl StreamAssembler {
    pub fn new() -> StreamAssembler {
        return StreamAssembler::default();
    }

    /// Fails a request that never produced a body, resetting the sink.
    pub fn reject(
        message: &str,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send + '_),
    ) -> RequestFailed {
        tracing::error!(reason = message, "Answer request failed before streaming");
        sink("");

        return RequestFailed::new(message);
    }

    /// Feeds one chunk and forwards whatever text is safe to show. Returns
    /// `true` once the end of response marker has been seen, after which no
    /// more chunks should be fed.
    pub fn push(
        &mut self,
        bytes: &[u8],
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send + '_),
    ) -> bool {
        if self.ended {
            return true;
        }

        let decoded = self.decoder.decode(bytes);
        if decoded.is_empty() {
            return false;
        }
        self.text.push_str(&decoded);

        if let Some(pos) = self.text[self.forwarded..].find(END_OF_RESPONSE) {
            let end = self.forwarded + pos;
            if end > self.forwarded {
                sink(&self.text[self.forwarded..end]);
            }
            sink(END_OF_RESPONSE);

            self.text.truncate(end);
            self.forwarded = end;
            self.ended = true;
            return true;
        }

        // Hold back a trailing "\n[EN..." until the next chunk settles it.
        let safe_end = self.text.len() - sentinel_prefix_len(&self.text[self.forwarded..]);
        if safe_end > self.forwarded {
            sink(&self.text[self.forwarded..safe_end]);
            self.forwarded = safe_end;
        }

        return false;
    }

    pub fn finish(
        mut self,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send + '_),
    ) -> AssembledAnswer {
        if !self.ended {
            let tail = self.decoder.finish();
            self.text.push_str(&tail);
            if self.text.len() > self.forwarded {
                sink(&self.text[self.forwarded..]);
                self.forwarded = self.text.len();
            }
        }

        if self.text.contains(INVALID_REQUEST_ERROR) {
            tracing::warn!("Answer stream reported the token limit was exceeded");
            return AssembledAnswer::token_limit_exceeded();
        }
        if self.text.contains(SERVER_ERROR) {
            tracing::warn!("Answer stream reported a server error");
            return AssembledAnswer::server_error();
        }

        tracing::debug!(
            length = self.text.len(),
            ended = self.ended,
            "Answer stream assembled"
        );
        return AssembledAnswer::new(&self.text);
    }

    /// Reads `stream` to completion, or until the end of response marker.
    pub async fn consume<S, B, E>(
        mut self,
        stream: S,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send + '_),
    ) -> Result<AssembledAnswer, RequestFailed>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        futures::pin_mut!(stream);

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if self.push(bytes.as_ref(), sink) {
                        break;
                    }
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::error!(error = %message, "Answer stream failed while reading");
                    sink("");

                    let tail = self.decoder.finish();
                    self.text.push_str(&tail);
                    return Err(RequestFailed {
                        message,
                        partial: self.text,
                    });
                }
            }
        }

        return Ok(self.finish(sink));
    }
}
