use serde::{Deserialize, Serialize};

use crate::format::write_varint;
use crate::io::{Available, DataInput};

/// Encodes a typed value to bytes and back.
///
/// `decode` reads from `input` starting at its current position and must
/// leave the cursor just past the value. `available` bounds how many bytes
/// belong to the value; self-delimiting codecs may ignore it.
pub trait ValueCodec {
    type Value;

    fn encode(&self, value: &Self::Value, out: &mut Vec<u8>) -> anyhow::Result<()>;

    fn decode(
        &self,
        input: &mut DataInput<'_>,
        available: Available,
    ) -> anyhow::Result<Self::Value>;

    /// Size of every encoded value, or `None` for variable-length encodings.
    fn fixed_size(&self) -> Option<usize> {
        None
    }
}

/// UTF-8 strings, prefixed with their byte length as a varint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Utf8Codec;

impl ValueCodec for Utf8Codec {
    type Value = String;

    fn encode(&self, value: &String, out: &mut Vec<u8>) -> anyhow::Result<()> {
        write_varint(out, value.len() as u64);
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(&self, input: &mut DataInput<'_>, _available: Available) -> anyhow::Result<String> {
        let len = input.read_len()?;
        let bytes = input.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

/// Opaque byte strings with no framing of their own; the value spans
/// exactly the bounded availability hint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawBytesCodec;

impl ValueCodec for RawBytesCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>, out: &mut Vec<u8>) -> anyhow::Result<()> {
        out.extend_from_slice(value);
        Ok(())
    }

    fn decode(&self, input: &mut DataInput<'_>, available: Available) -> anyhow::Result<Vec<u8>> {
        match available {
            Available::Bounded(n) => Ok(input.take(n)?.to_vec()),
            Available::Unbounded => {
                anyhow::bail!("raw byte values need a bounded availability hint")
            }
        }
    }
}

/// Unsigned integers as a single varint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct U64Codec;

impl ValueCodec for U64Codec {
    type Value = u64;

    fn encode(&self, value: &u64, out: &mut Vec<u8>) -> anyhow::Result<()> {
        write_varint(out, *value);
        Ok(())
    }

    fn decode(&self, input: &mut DataInput<'_>, _available: Available) -> anyhow::Result<u64> {
        Ok(input.read_varint()?)
    }
}
