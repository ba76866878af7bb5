//! The svndiff binary delta codec (C4): windows of COPY_FROM_SOURCE /
//! COPY_FROM_TARGET / COPY_FROM_NEW instructions against a big-endian
//! base-128 varint framing, with optional per-stream zlib deflation.

use crate::error::{GsvnError, GsvnResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

mod varint;
pub use varint::{read_varint, write_varint};

/// one `≤ 64 KiB` encoder window; kept well under typical network MTUs
/// and matches the encoder policy's window-size bound.
const MAX_ENCODER_WINDOW: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Plain = 0,
    Compressed = 1,
}

impl Version {
    fn from_byte(b: u8) -> GsvnResult<Self> {
        match b {
            0 => Ok(Version::Plain),
            1 => Ok(Version::Compressed),
            v => Err(GsvnError::delta(format!("unsupported svndiff version {}", v))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// copy `length` bytes from `source_offset + offset` within the
    /// window's declared source slice
    FromSource { offset: u64, length: u64 },
    /// copy `length` bytes from already-produced target bytes starting at
    /// `offset`; `length` may exceed the distance to the current output
    /// position, in which case the copy wraps (the "FROM_TARGET repeat")
    FromTarget { offset: u64, length: u64 },
    /// consume `length` bytes from the window's new-data stream
    FromNew { length: u64 },
}

const TAG_FROM_SOURCE: u8 = 0 << 6;
const TAG_FROM_TARGET: u8 = 1 << 6;
const TAG_FROM_NEW: u8 = 2 << 6;
const TAG_MASK: u8 = 0b1100_0000;
const LEN_MASK: u8 = 0b0011_1111;

impl Instruction {
    fn tag(&self) -> u8 {
        match self {
            Instruction::FromSource { .. } => TAG_FROM_SOURCE,
            Instruction::FromTarget { .. } => TAG_FROM_TARGET,
            Instruction::FromNew { .. } => TAG_FROM_NEW,
        }
    }

    fn length(&self) -> u64 {
        match *self {
            Instruction::FromSource { length, .. }
            | Instruction::FromTarget { length, .. }
            | Instruction::FromNew { length } => length,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) -> GsvnResult<()> {
        let length = self.length();
        if length < LEN_MASK as u64 {
            out.push(self.tag() | length as u8);
        } else {
            out.push(self.tag());
            write_varint(length, out);
        }
        match *self {
            Instruction::FromSource { offset, .. } | Instruction::FromTarget { offset, .. } => {
                write_varint(offset, out);
            }
            Instruction::FromNew { .. } => {}
        }
        Ok(())
    }

    fn decode(r: &mut &[u8]) -> GsvnResult<Self> {
        if r.is_empty() {
            return Err(GsvnError::delta("truncated instruction stream"));
        }
        let header = r[0];
        *r = &r[1..];
        let packed_len = (header & LEN_MASK) as u64;
        let length = if packed_len != 0 { packed_len } else { read_varint(r)? };
        match header & TAG_MASK {
            TAG_FROM_SOURCE => Ok(Instruction::FromSource { offset: read_varint(r)?, length }),
            TAG_FROM_TARGET => Ok(Instruction::FromTarget { offset: read_varint(r)?, length }),
            TAG_FROM_NEW => Ok(Instruction::FromNew { length }),
            _ => Err(GsvnError::delta("invalid instruction tag")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub source_offset: u64,
    pub source_length: u64,
    pub target_length: u64,
    pub instructions: Vec<Instruction>,
    pub new_data: Vec<u8>,
}

/// a full svndiff stream: the version byte plus the back-to-back windows
/// it frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub version: u8,
    pub windows: Vec<Window>,
}

fn packed_stream(version: Version, raw: &[u8], out: &mut Vec<u8>) -> GsvnResult<()> {
    if version == Version::Plain {
        write_varint(raw.len() as u64, out);
        out.extend_from_slice(raw);
        return Ok(());
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).map_err(|e| GsvnError::delta(e.to_string()))?;
    let compressed = encoder.finish().map_err(|e| GsvnError::delta(e.to_string()))?;
    if compressed.len() < raw.len() {
        write_varint(raw.len() as u64, out);
        out.extend_from_slice(&compressed);
    } else {
        // deflating didn't help: store literally, uncompressed_length == packed_length
        write_varint(raw.len() as u64, out);
        out.extend_from_slice(raw);
    }
    Ok(())
}

fn read_packed_stream(version: Version, r: &mut &[u8], packed_length: u64) -> GsvnResult<Vec<u8>> {
    let uncompressed_length = read_varint(r)? as usize;
    let packed_length = packed_length as usize;
    if packed_length > r.len() {
        return Err(GsvnError::delta("packed stream runs past window end"));
    }
    let (packed, rest) = r.split_at(packed_length);
    *r = rest;
    if version == Version::Plain || uncompressed_length == packed.len() {
        return Ok(packed.to_vec());
    }
    let mut decoder = ZlibDecoder::new(packed);
    let mut out = Vec::with_capacity(uncompressed_length);
    decoder.read_to_end(&mut out).map_err(|e| GsvnError::delta(e.to_string()))?;
    if out.len() != uncompressed_length {
        return Err(GsvnError::delta("deflated stream length mismatch"));
    }
    Ok(out)
}

impl Window {
    fn encode(&self, version: Version, out: &mut Vec<u8>) -> GsvnResult<()> {
        let mut inst_bytes = Vec::new();
        for inst in &self.instructions {
            inst.encode(&mut inst_bytes)?;
        }
        let mut inst_packed = Vec::new();
        packed_stream(version, &inst_bytes, &mut inst_packed)?;
        let mut new_data_packed = Vec::new();
        packed_stream(version, &self.new_data, &mut new_data_packed)?;

        write_varint(self.source_offset, out);
        write_varint(self.source_length, out);
        write_varint(self.target_length, out);
        write_varint(inst_packed.len() as u64, out);
        write_varint(new_data_packed.len() as u64, out);
        out.extend_from_slice(&inst_packed);
        out.extend_from_slice(&new_data_packed);
        Ok(())
    }

    fn decode(version: Version, r: &mut &[u8]) -> GsvnResult<Self> {
        let source_offset = read_varint(r)?;
        let source_length = read_varint(r)?;
        let target_length = read_varint(r)?;
        let instructions_length = read_varint(r)?;
        let new_data_length = read_varint(r)?;

        let inst_bytes = read_packed_stream(version, r, instructions_length)?;
        let new_data = read_packed_stream(version, r, new_data_length)?;

        let mut inst_slice = &inst_bytes[..];
        let mut instructions = Vec::new();
        while !inst_slice.is_empty() {
            instructions.push(Instruction::decode(&mut inst_slice)?);
        }

        let _ = new_data_length;
        Ok(Window { source_offset, source_length, target_length, instructions, new_data })
    }

    /// apply this window against `source`, appending to `target`
    pub fn apply(&self, source: &[u8], target: &mut Vec<u8>) -> GsvnResult<()> {
        let window_start = target.len();
        let mut new_data = &self.new_data[..];
        for inst in &self.instructions {
            match *inst {
                Instruction::FromSource { offset, length } => {
                    let (offset, length) = (offset as usize, length as usize);
                    let end = offset.checked_add(length).ok_or_else(|| {
                        GsvnError::delta("FROM_SOURCE instruction overflows source")
                    })?;
                    if end > self.source_length as usize || self.source_offset as usize + end > source.len()
                    {
                        return Err(GsvnError::delta("FROM_SOURCE instruction out of range"));
                    }
                    let base = self.source_offset as usize;
                    target.extend_from_slice(&source[base + offset..base + end]);
                }
                Instruction::FromTarget { offset, length } => {
                    let offset = window_start + offset as usize;
                    let mut remaining = length as usize;
                    let mut pos = offset;
                    if pos >= target.len() {
                        return Err(GsvnError::delta("FROM_TARGET offset out of range"));
                    }
                    while remaining > 0 {
                        let run = (target.len() - pos).min(remaining);
                        // copy byte-by-byte: `target` may grow mid-loop when
                        // pos falls within the bytes we are in the middle of
                        // reproducing (the "repeat" case)
                        for i in 0..run {
                            let b = target[pos + i];
                            target.push(b);
                        }
                        remaining -= run;
                        pos += run;
                    }
                }
                Instruction::FromNew { length } => {
                    let length = length as usize;
                    if new_data.len() < length {
                        return Err(GsvnError::delta("new-data stream exhausted early"));
                    }
                    target.extend_from_slice(&new_data[..length]);
                    new_data = &new_data[length..];
                }
            }
        }
        if !new_data.is_empty() {
            return Err(GsvnError::delta("new-data stream not fully consumed"));
        }
        if target.len() - window_start != self.target_length as usize {
            return Err(GsvnError::delta("window produced wrong number of bytes"));
        }
        Ok(())
    }
}

impl Delta {
    pub fn decode(bytes: &[u8]) -> GsvnResult<Self> {
        if bytes.len() < 4 || &bytes[0..3] != b"SVN" {
            return Err(GsvnError::delta("missing SVN magic"));
        }
        let version = Version::from_byte(bytes[3])?;
        let mut r = &bytes[4..];
        let mut windows = Vec::new();
        while !r.is_empty() {
            windows.push(Window::decode(version, &mut r)?);
        }
        Ok(Delta { version: version as u8, windows })
    }

    /// apply every window in order against `source`, returning the target
    pub fn apply(&self, source: &[u8]) -> GsvnResult<Vec<u8>> {
        let mut target = Vec::new();
        for window in &self.windows {
            window.apply(source, &mut target)?;
        }
        Ok(target)
    }

    /// encode `target` as a single-window-per-64KiB plain or deflated
    /// svndiff stream with no source slice, per the encoder policy: each
    /// window is one `FROM_NEW` instruction, deflated only when smaller.
    pub fn encode(target: &[u8], compress: bool) -> GsvnResult<Vec<u8>> {
        let version = if compress { Version::Compressed } else { Version::Plain };
        let mut out = Vec::new();
        out.extend_from_slice(b"SVN");
        out.push(version as u8);
        for chunk in target.chunks(MAX_ENCODER_WINDOW) {
            let window = Window {
                source_offset: 0,
                source_length: 0,
                target_length: chunk.len() as u64,
                instructions: vec![Instruction::FromNew { length: chunk.len() as u64 }],
                new_data: chunk.to_vec(),
            };
            window.encode(version, &mut out)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests;
