//! Gzip round trip through the scratch directory.

use super::io::{write_random, ScratchFile};
use crate::error::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::RngCore;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Write a random file, gzip it, gunzip it into `decompress/`, then delete
/// all three. Returns the decompressed size.
pub(super) fn round_trip<R: RngCore>(
    scratch_dir: &Path,
    size_mb: u64,
    work_index: usize,
    rng: &mut R,
) -> Result<u64> {
    let source = ScratchFile::new(scratch_dir, "compress", format!("random_file_{work_index}.bin"))?;
    let compressed = source.with_suffix(".gz");
    let restored = ScratchFile::new(
        scratch_dir,
        "decompress",
        format!("decompressed_file_{work_index}.bin"),
    )?;

    write_random(source.path(), size_mb, rng)?;

    let mut encoder = GzEncoder::new(
        BufWriter::new(File::create(compressed.path())?),
        Compression::default(),
    );
    io::copy(&mut BufReader::new(File::open(source.path())?), &mut encoder)?;
    encoder.finish()?.flush()?;

    let mut decoder = GzDecoder::new(BufReader::new(File::open(compressed.path())?));
    let mut out = BufWriter::new(File::create(restored.path())?);
    let written = io::copy(&mut decoder, &mut out)?;
    out.flush()?;

    Ok(written)
}
