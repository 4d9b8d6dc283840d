//! Header-length disambiguation for framed Avro payloads.
//!
//! Producers prefix the schemaless Avro datum with a header whose length
//! depends on the serializer: nothing, the 5-byte Confluent wire format
//! (magic byte + 4-byte schema id), Apicurio's 9-byte variant (magic byte +
//! 8-byte global id), and a few others seen in the wild. The length is not
//! recorded anywhere, so [`FrameDecoder`] tries each candidate in ascending
//! order and keeps the first one that decodes the remainder completely.
//!
//! First success wins. A wrong header length can still decode into
//! plausible nonsense; every attempt is kept on the result so that case can
//! be diagnosed.

use super::convert::avro_to_decoded;
use apache_avro::Schema;
use cdc_types::DecodedValue;
use std::fmt;
use thiserror::Error;

/// Header lengths tried when none are configured.
pub const DEFAULT_HEADER_CANDIDATES: [usize; 5] = [0, 5, 9, 10, 13];

/// Field name used when the decoded root is not a record.
pub const SCALAR_ROOT_FIELD: &str = "_";

/// Largest length or item count accepted from a datum.
///
/// Above Kafka's default `message.max.bytes`. apache-avro reserves
/// `count * size_of::<Value>()` for an array block up front, so a wrong
/// header length must not be able to declare more items than this.
pub const MAX_DECODE_ALLOCATION_BYTES: usize = 2 * 1024 * 1024;

/// Install [`MAX_DECODE_ALLOCATION_BYTES`] as apache-avro's process-wide limit.
///
/// The limit can only be set once and is frozen by the first decode, so this
/// runs whenever a decoder is built. Returns the limit in effect.
pub fn bound_decode_allocations() -> usize {
    apache_avro::max_allocation_bytes(MAX_DECODE_ALLOCATION_BYTES)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Nothing left after stripping the header.
    Skipped,
    /// The datum decoded but did not consume the whole buffer.
    TrailingBytes(usize),
    Failed(String),
    Decoded,
}

/// One candidate header length and what happened when it was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAttempt {
    pub header_len: usize,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for FrameAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Skipped => write!(f, "{}: no payload", self.header_len),
            AttemptOutcome::TrailingBytes(n) => {
                write!(f, "{}: {n} trailing byte(s)", self.header_len)
            }
            AttemptOutcome::Failed(reason) => write!(f, "{}: {reason}", self.header_len),
            AttemptOutcome::Decoded => write!(f, "{}: ok", self.header_len),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Failed to decode with header lengths {}; dumping raw bytes as base64",
    describe_attempts(.attempts)
)]
pub struct FrameDecodeError {
    pub attempts: Vec<FrameAttempt>,
}

fn describe_attempts(attempts: &[FrameAttempt]) -> String {
    let parts: Vec<String> = attempts.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// A successful decode and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct FramedDecode {
    /// The winning header length.
    pub header_len: usize,
    /// The decoded record; scalar roots are wrapped under [`SCALAR_ROOT_FIELD`].
    pub value: DecodedValue,
    /// Every attempt up to and including the winning one.
    pub attempts: Vec<FrameAttempt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDecoder {
    candidates: Vec<usize>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_CANDIDATES)
    }
}

impl FrameDecoder {
    /// Candidates are tried in ascending order; duplicates are dropped.
    pub fn new(candidates: impl IntoIterator<Item = usize>) -> Self {
        bound_decode_allocations();
        let mut candidates: Vec<usize> = candidates.into_iter().collect();
        candidates.sort_unstable();
        candidates.dedup();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    pub fn decode(&self, bytes: &[u8], schema: &Schema) -> Result<FramedDecode, FrameDecodeError> {
        let mut attempts = Vec::with_capacity(self.candidates.len());

        for &header_len in &self.candidates {
            if bytes.len() <= header_len {
                attempts.push(FrameAttempt {
                    header_len,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            }

            let mut remaining = &bytes[header_len..];
            let outcome = match apache_avro::from_avro_datum(schema, &mut remaining, None) {
                Ok(value) if remaining.is_empty() => {
                    attempts.push(FrameAttempt {
                        header_len,
                        outcome: AttemptOutcome::Decoded,
                    });
                    return Ok(FramedDecode {
                        header_len,
                        value: as_record(avro_to_decoded(value)),
                        attempts,
                    });
                }
                Ok(_) => AttemptOutcome::TrailingBytes(remaining.len()),
                Err(e) => AttemptOutcome::Failed(e.to_string()),
            };
            attempts.push(FrameAttempt {
                header_len,
                outcome,
            });
        }

        Err(FrameDecodeError { attempts })
    }
}

fn as_record(value: DecodedValue) -> DecodedValue {
    if value.is_record() {
        value
    } else {
        DecodedValue::record([(SCALAR_ROOT_FIELD, value)])
    }
}
