//! gzip compression of link payloads
//!
//! Output is a single standard gzip member, interchangeable with what browser
//! gzip libraries produce. Decompression validates the header, CRC and length
//! trailer and refuses to inflate beyond [`MAX_DECOMPRESSED_SIZE`].

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{self, Read, Write};

/// gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound on inflated payload size (64 MiB)
pub const MAX_DECOMPRESSED_SIZE: u64 = 64 * 1024 * 1024;

/// Compress `data` into a gzip stream.
///
/// Input larger than [`MAX_DECOMPRESSED_SIZE`] is refused with `InvalidInput`
/// so that everything compressed here can be decompressed again.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    if data.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload exceeds {MAX_DECOMPRESSED_SIZE} bytes"),
        ));
    }
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a gzip stream produced by [`compress`] or any gzip writer.
///
/// Malformed input of any kind yields an `InvalidData` error.
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    if data.len() < GZIP_MAGIC.len() || data[..2] != GZIP_MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "not a gzip stream"));
    }

    let mut out = Vec::with_capacity(data.len() * 3);
    GzDecoder::new(data)
        .take(MAX_DECOMPRESSED_SIZE + 1)
        .read_to_end(&mut out)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("malformed gzip stream: {e}")))?;

    if out.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed payload exceeds {MAX_DECOMPRESSED_SIZE} bytes"),
        ));
    }
    Ok(out)
}
