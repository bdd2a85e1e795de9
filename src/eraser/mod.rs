//! Secure erase — overwrite a file with random data before unlinking it.
//!
//! Each pass writes `len` fresh random bytes from offset 0 and is forced
//! to stable storage with `fsync` before the next one starts.  After the
//! last pass the directory entry is removed.
//!
//! This is best-effort.  Copy-on-write filesystems (btrfs, ZFS, APFS),
//! wear-levelled flash and snapshots can all keep the original blocks
//! around; nothing here can reach those.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Number of overwrite passes used unless configured otherwise.
pub const DEFAULT_PASSES: u32 = 3;

const WIPE_CHUNK_LEN: usize = 8 * 1024;

/// Overwrite `path` with `passes` rounds of random data, then delete it.
///
/// Blocks until every pass has been flushed.  Runtime is proportional to
/// the file size times `passes`.
pub fn wipe<R: CryptoRng + ?Sized>(path: &Path, passes: u32, rng: &mut R) -> Result<()> {
    if passes < 1 {
        return Err(VaultError::ConfigError(
            "secure erase needs at least one overwrite pass".into(),
        ));
    }

    // Do not follow symlinks: overwriting the link target is never intended.
    let meta = fs::symlink_metadata(path)?;
    if !meta.is_file() {
        return Err(VaultError::NotAFile(path.to_path_buf()));
    }
    let len = meta.len();

    let mut file = OpenOptions::new().write(true).open(path)?;
    let mut buf = Zeroizing::new(vec![0u8; WIPE_CHUNK_LEN]);

    for _ in 0..passes {
        file.seek(SeekFrom::Start(0))?;
        let mut remaining = len;
        while remaining > 0 {
            let n = usize::try_from(remaining).map_or(WIPE_CHUNK_LEN, |r| r.min(WIPE_CHUNK_LEN));
            rng.fill_bytes(&mut buf[..n]);
            file.write_all(&buf[..n])?;
            remaining -= n as u64;
        }
        file.flush()?;
        file.sync_all()?;
    }

    drop(file);
    fs::remove_file(path)?;
    Ok(())
}

/// Best-effort cleanup of a partially written file.
///
/// Tries a single-pass wipe and falls back to a plain unlink.  Errors are
/// ignored: this runs on paths that are already failing.
pub(crate) fn discard<R: CryptoRng + ?Sized>(path: &Path, rng: &mut R) {
    if wipe(path, 1, rng).is_err() && path.exists() {
        let _ = fs::remove_file(path);
    }
}
