//! High-level vault operations used by CLI commands.
//!
//! `VaultStore` owns the private vault directory and wraps the binary
//! format layer so the rest of the application can work with simple
//! calls like `store.add_file(&key, path, now, &mut rng)`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};

use super::format::{self, ItemHeader, ITEM_EXTENSION, MAX_NAME_LEN};
use super::item::{ItemListing, ItemSummary};
use crate::crypto::SessionKey;
use crate::eraser;
use crate::errors::{Result, VaultError};

/// Longest sanitized original-name prefix used in an item file name, so
/// the full name stays well under common 255-byte filesystem limits.
const MAX_STEM_CHARS: usize = 200;

/// The vault directory handle.
pub struct VaultStore {
    /// Directory holding the credential record and all items.
    dir: PathBuf,

    /// Overwrite passes used when deleting items.
    wipe_passes: u32,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create the vault directory (owner-only on Unix) if it is missing.
    pub fn create_dir(dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }

        Ok(())
    }

    /// Open an existing vault directory.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(VaultError::VaultNotInitialized(dir.to_path_buf()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            wipe_passes: eraser::DEFAULT_PASSES,
        })
    }

    /// Override the number of overwrite passes used by `delete`.
    pub fn with_wipe_passes(mut self, passes: u32) -> Self {
        self.wipe_passes = passes;
        self
    }

    // ------------------------------------------------------------------
    // Item operations
    // ------------------------------------------------------------------

    /// Encrypt the file at `source` into a new vault item.
    ///
    /// Returns the item's file name inside the vault directory.
    pub fn add_file<G: CryptoRng + ?Sized>(
        &self,
        key: &SessionKey,
        source: &Path,
        now: DateTime<Utc>,
        rng: &mut G,
    ) -> Result<String> {
        let meta = fs::metadata(source)?;
        if !meta.is_file() {
            return Err(VaultError::NotAFile(source.to_path_buf()));
        }

        let original_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| VaultError::NotAFile(source.to_path_buf()))?;

        let mut reader = BufReader::new(File::open(source)?);
        self.add_reader(key, &mut reader, &original_name, meta.len(), now, rng)
    }

    /// Encrypt `original_size` bytes from `reader` into a new vault item
    /// recorded under `original_name`.
    ///
    /// The item is written to an exclusively created temp file, synced,
    /// and only then moved into place; an existing item is never
    /// overwritten.  On any failure the temp file is erased.
    pub fn add_reader<R: Read, G: CryptoRng + ?Sized>(
        &self,
        key: &SessionKey,
        reader: &mut R,
        original_name: &str,
        original_size: u64,
        now: DateTime<Utc>,
        rng: &mut G,
    ) -> Result<String> {
        if original_name.len() > MAX_NAME_LEN {
            return Err(VaultError::NameTooLong(original_name.len()));
        }

        let file_name = item_file_name(original_name, now);
        let dest = self.dir.join(&file_name);
        if dest.exists() {
            return Err(VaultError::ItemAlreadyExists(file_name));
        }

        let tmp_path = self.dir.join(format!(".{file_name}.tmp"));
        let tmp = create_exclusive(&tmp_path)?;

        let written = write_item(tmp, reader, original_name, original_size, key, rng);
        if let Err(e) = written {
            eraser::discard(&tmp_path, rng);
            return Err(e);
        }

        if dest.exists() {
            eraser::discard(&tmp_path, rng);
            return Err(VaultError::ItemAlreadyExists(file_name));
        }
        fs::rename(&tmp_path, &dest)?;
        sync_dir(&self.dir);

        Ok(file_name)
    }

    /// List every item in the vault, sorted by file name.
    ///
    /// Only headers are read.  A file that fails to parse is reported as
    /// `ItemListing::Invalid` and does not stop the listing.
    pub fn list_items(&self) -> Result<Vec<ItemListing>> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| is_item_file_name(name))
            .collect();
        names.sort();

        let listings = names
            .into_iter()
            .map(|file_name| match self.summarize(&file_name) {
                Ok(summary) => ItemListing::Valid(summary),
                Err(error) => ItemListing::Invalid { file_name, error },
            })
            .collect();

        Ok(listings)
    }

    /// Read just the header of one item.
    pub fn read_item_header(&self, item_name: &str) -> Result<ItemHeader> {
        let path = self.existing_item_path(item_name)?;
        let mut reader = BufReader::new(File::open(path)?);
        format::read_header(&mut reader)
    }

    /// Decrypt an item into `out_dir`, returning the path written.
    ///
    /// The output is named after the stored original name (final path
    /// component only) and never overwrites an existing file: `name(1).ext`,
    /// `name(2).ext`, … are tried instead.  Plaintext is staged in an
    /// exclusively created temp file and renamed into place only after the
    /// item decoded and authenticated completely.
    pub fn extract<G: CryptoRng + ?Sized>(
        &self,
        key: &SessionKey,
        item_name: &str,
        out_dir: &Path,
        rng: &mut G,
    ) -> Result<PathBuf> {
        let path = self.existing_item_path(item_name)?;
        fs::create_dir_all(out_dir)?;

        // Unique per run so a leftover from an interrupted extract never blocks.
        let staging = out_dir.join(format!(".{item_name}.{:08x}.partial", rng.next_u32()));
        let tmp = create_exclusive(&staging)?;

        let mut reader = BufReader::new(File::open(&path)?);
        let decoded = read_item(&mut reader, key, tmp);
        let header = match decoded {
            Ok(header) => header,
            Err(e) => {
                eraser::discard(&staging, rng);
                return Err(e);
            }
        };

        let target = unique_path(&out_dir.join(output_file_name(&header.original_name)));
        if let Err(e) = fs::rename(&staging, &target) {
            eraser::discard(&staging, rng);
            return Err(e.into());
        }

        Ok(target)
    }

    /// Securely erase an item.
    pub fn delete<G: CryptoRng + ?Sized>(&self, item_name: &str, rng: &mut G) -> Result<()> {
        let path = self.existing_item_path(item_name)?;
        eraser::wipe(&path, self.wipe_passes, rng)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the number of item files (valid or not) in the vault.
    pub fn item_count(&self) -> Result<usize> {
        Ok(self.list_items()?.len())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn summarize(&self, file_name: &str) -> Result<ItemSummary> {
        let path = self.dir.join(file_name);
        let file = File::open(&path)?;
        let modified = file.metadata()?.modified()?;
        let header = format::read_header(&mut BufReader::new(file))?;

        Ok(ItemSummary {
            file_name: file_name.to_string(),
            original_name: header.original_name,
            original_size: header.original_size,
            modified: DateTime::<Utc>::from(modified),
        })
    }

    /// Resolve a user-supplied item name to a path inside the vault.
    ///
    /// Only bare `*.sv` file names are accepted, so nothing outside the
    /// vault directory (or the credential record inside it) can be
    /// reached through an item name.
    fn existing_item_path(&self, item_name: &str) -> Result<PathBuf> {
        let bare = !item_name.is_empty()
            && item_name != "."
            && item_name != ".."
            && !item_name.contains(['/', '\\', '\0']);
        if !bare || !is_item_file_name(item_name) {
            return Err(VaultError::InvalidItemName(item_name.to_string()));
        }

        let path = self.dir.join(item_name);
        if !path.is_file() {
            return Err(VaultError::ItemNotFound(item_name.to_string()));
        }
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Naming helpers
// ---------------------------------------------------------------------------

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Deterministic item file name: `<sanitized name>_<epoch millis>.sv`.
pub fn item_file_name(original_name: &str, now: DateTime<Utc>) -> String {
    let stem: String = sanitize_name(original_name)
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    format!("{stem}_{}.{ITEM_EXTENSION}", now.timestamp_millis())
}

/// First of `path`, `stem(1).ext`, `stem(2).ext`, … that does not exist.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };

    let mut i: u64 = 1;
    loop {
        let candidate = parent.join(format!("{stem}({i}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

fn is_item_file_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map_or(false, |ext| ext == ITEM_EXTENSION)
}

/// The stored original name is not authenticated, so only its final
/// component is trusted as an output file name.
fn output_file_name(original_name: &str) -> String {
    let last = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    if last.is_empty() || last == "." || last == ".." {
        "extracted".to_string()
    } else {
        last.to_string()
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn create_exclusive(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

fn write_item<R: Read, G: CryptoRng + ?Sized>(
    file: File,
    reader: &mut R,
    original_name: &str,
    original_size: u64,
    key: &SessionKey,
    rng: &mut G,
) -> Result<()> {
    let mut writer = BufWriter::new(file);
    format::encode(reader, original_name, original_size, key, rng, &mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| VaultError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn read_item(reader: &mut BufReader<File>, key: &SessionKey, file: File) -> Result<ItemHeader> {
    let mut writer = BufWriter::new(file);
    let header = format::decode(reader, key, &mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| VaultError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(header)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
