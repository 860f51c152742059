//! File write/copy workload and the scratch-file helpers shared with the
//! compression workload.

use crate::error::Result;
use rand::RngCore;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MIB: usize = 1024 * 1024;

/// A file under the scratch directory, removed when dropped.
pub(super) struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve `<scratch_dir>/<subdir>/<name>`, creating the directory.
    pub(super) fn new(scratch_dir: &Path, subdir: &str, name: String) -> Result<Self> {
        let dir = scratch_dir.join(subdir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join(name),
        })
    }

    /// Sibling path with `suffix` appended to the file name.
    pub(super) fn with_suffix(&self, suffix: &str) -> Self {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        Self {
            path: PathBuf::from(name),
        }
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // may not exist if the workload failed before writing it
        let _ = fs::remove_file(&self.path);
    }
}

/// Fill `path` with `size_mb` MiB of random bytes.
pub(super) fn write_random<R: RngCore>(path: &Path, size_mb: u64, rng: &mut R) -> Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut chunk = vec![0u8; MIB];
    for _ in 0..size_mb {
        rng.fill_bytes(&mut chunk);
        out.write_all(&chunk)?;
    }
    out.flush()?;
    Ok(size_mb * MIB as u64)
}

/// Write a random file, copy it, then delete both. Returns bytes copied.
pub(super) fn write_and_copy<R: RngCore>(
    scratch_dir: &Path,
    size_mb: u64,
    work_index: usize,
    rng: &mut R,
) -> Result<u64> {
    let source = ScratchFile::new(scratch_dir, "write", format!("random_file_{work_index}.bin"))?;
    let copy = ScratchFile::new(scratch_dir, "copy", format!("copy_file_{work_index}.bin"))?;

    write_random(source.path(), size_mb, rng)?;
    let copied = fs::copy(source.path(), copy.path())?;
    Ok(copied)
}
