use crate::error::GsvnResult;
use std::io::{prelude::*, BufReader};

pub trait Serialize {
    fn serialize(&self, writer: &mut dyn Write) -> GsvnResult<()>;
}

pub trait BufReadSeek: BufRead + Seek {}

impl<R: BufRead + Seek> BufReadSeek for R {
}

// explicit `Self: Sized` bounds on each method (instead of on the trait)
// keep `Deserialize` object-safe for callers that only need the methods
// that don't require it.
pub trait Deserialize {
    fn deserialize(reader: &mut impl BufRead) -> GsvnResult<Self>
    where
        Self: Sized;

    fn deserialize_unbuffered(reader: impl Read) -> GsvnResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize(&mut BufReader::new(reader))
    }
}

/// like [`Deserialize`] but for formats where the reader doesn't
/// self-delimit and the caller must supply the byte length up front
/// (the svndiff packed streams, mainly).
pub trait DeserializeSized {
    fn deserialize_sized(reader: &mut impl BufRead, size: u64) -> GsvnResult<Self>
    where
        Self: Sized;

    fn deserialize_from_slice(slice: &[u8]) -> GsvnResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize_sized_unbuffered(slice, slice.len() as u64)
    }

    fn deserialize_sized_unbuffered(reader: impl Read, size: u64) -> GsvnResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize_sized(&mut BufReader::new(reader), size)
    }
}

impl<D: Deserialize> DeserializeSized for D {
    fn deserialize_sized(reader: &mut impl BufRead, _size: u64) -> GsvnResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize(reader)
    }
}

impl Serialize for Vec<u8> {
    fn serialize(&self, writer: &mut dyn Write) -> GsvnResult<()> {
        writer.write_all(self)?;
        Ok(())
    }
}

impl Deserialize for Vec<u8> {
    fn deserialize(reader: &mut impl BufRead) -> GsvnResult<Self>
    where
        Self: Sized,
    {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}
