//! Schema-directed decoding of Avro payloads.

pub mod convert;
pub mod frame;

pub use convert::avro_to_decoded;
pub use frame::{
    AttemptOutcome, FrameAttempt, FrameDecodeError, FrameDecoder, FramedDecode,
    bound_decode_allocations, DEFAULT_HEADER_CANDIDATES, MAX_DECODE_ALLOCATION_BYTES, SCALAR_ROOT_FIELD,
};
