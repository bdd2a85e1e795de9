//! The persisted vault credential.
//!
//! Stored as `vault.properties` in the vault directory, one `key=value`
//! per line in Java-properties syntax:
//!
//! ```text
//! #SecureVault metadata - DO NOT SHARE
//! version=1
//! salt=<base64>
//! hash=<base64>
//! iters=200000
//! failed=0
//! lockUntil=0
//! ```
//!
//! Base64 padding is written escaped (`\=`) and `#`/`!` lines are
//! comments, so records written by earlier releases load unchanged.
//! A record without a `version` key is read as version 1.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{KEY_LEN, SALT_LEN};
use crate::errors::{Result, VaultError};

/// File name of the credential record inside the vault directory.
pub const CREDENTIAL_FILE: &str = "vault.properties";

/// Current credential record schema version.
pub const CURRENT_RECORD_VERSION: u32 = 1;

const HEADER_COMMENT: &str = "#SecureVault metadata - DO NOT SHARE";

/// The one credential a vault has.
///
/// `hash` is `PBKDF2(password, salt, iterations)`.  `failed_attempts` and
/// `lock_until_ms` are the persisted lockout counters; both are zero
/// after any successful unlock.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct VaultCredential {
    pub version: u32,
    pub salt: [u8; SALT_LEN],
    pub hash: [u8; KEY_LEN],
    pub iterations: u32,
    pub failed_attempts: u32,
    /// Epoch milliseconds; `0` means no lock has been set.
    pub lock_until_ms: i64,
}

impl VaultCredential {
    /// A fresh credential with cleared lockout counters.
    pub fn new(salt: [u8; SALT_LEN], hash: [u8; KEY_LEN], iterations: u32) -> Self {
        Self {
            version: CURRENT_RECORD_VERSION,
            salt,
            hash,
            iterations,
            failed_attempts: 0,
            lock_until_ms: 0,
        }
    }

    /// Path of the credential record inside `vault_dir`.
    pub fn path_in(vault_dir: &Path) -> PathBuf {
        vault_dir.join(CREDENTIAL_FILE)
    }

    /// The lock expiry as a timestamp, if one is set.
    pub fn lock_until(&self) -> Option<DateTime<Utc>> {
        if self.lock_until_ms == 0 {
            None
        } else {
            DateTime::from_timestamp_millis(self.lock_until_ms)
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Render the record in properties syntax.
    pub fn to_properties(&self) -> String {
        let fields = [
            ("version", self.version.to_string()),
            ("salt", BASE64.encode(self.salt)),
            ("hash", BASE64.encode(self.hash)),
            ("iters", self.iterations.to_string()),
            ("failed", self.failed_attempts.to_string()),
            ("lockUntil", self.lock_until_ms.to_string()),
        ];

        let mut out = String::new();
        out.push_str(HEADER_COMMENT);
        out.push('\n');
        for (key, value) in fields {
            out.push_str(key);
            out.push('=');
            out.push_str(&escape_value(&value));
            out.push('\n');
        }
        out
    }

    /// Parse a record from properties syntax.
    pub fn from_properties(text: &str) -> Result<Self> {
        let props = parse_properties(text);

        let version = match props.get("version") {
            Some(v) => parse_number::<u32>(v, "version")?,
            None => 1,
        };
        if version > CURRENT_RECORD_VERSION {
            return Err(VaultError::CredentialError(format!(
                "record version {version} is newer than this build supports ({CURRENT_RECORD_VERSION})"
            )));
        }

        let salt = decode_fixed::<SALT_LEN>(required(&props, "salt")?, "salt")?;
        let hash = decode_fixed::<KEY_LEN>(required(&props, "hash")?, "hash")?;

        let iterations = parse_number::<u32>(required(&props, "iters")?, "iters")?;
        if iterations < 1 {
            return Err(VaultError::CredentialError(
                "iters must be at least 1".into(),
            ));
        }

        let failed_attempts = match props.get("failed") {
            Some(v) => parse_number::<u32>(v, "failed")?,
            None => 0,
        };
        let lock_until_ms = match props.get("lockUntil") {
            Some(v) => parse_number::<i64>(v, "lockUntil")?,
            None => 0,
        };

        Ok(Self {
            version,
            salt,
            hash,
            iterations,
            failed_attempts,
            lock_until_ms,
        })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Load the record from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            return Err(VaultError::VaultNotInitialized(dir));
        }
        // Properties files are ISO-8859-1; every byte maps to one char.
        let text: String = fs::read(path)?.iter().map(|&b| char::from(b)).collect();
        Self::from_properties(&text)
    }

    /// Write the record to disk **atomically and durably**.
    ///
    /// 1. Write to a temp file in the same directory (owner-only on Unix).
    /// 2. `fsync` the temp file.
    /// 3. Rename it over the target path.
    /// 4. `fsync` the directory so the rename itself survives a crash.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or(Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(self.to_properties().as_bytes())?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        sync_dir(parent);
        Ok(())
    }
}

// Never print the hash: it is the session key.
impl std::fmt::Debug for VaultCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultCredential")
            .field("version", &self.version)
            .field("iterations", &self.iterations)
            .field("failed_attempts", &self.failed_attempts)
            .field("lock_until_ms", &self.lock_until_ms)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Properties syntax helpers
// ---------------------------------------------------------------------------

/// Parse `key=value` / `key:value` lines.  Comment lines start with `#`
/// or `!`; backslash escapes are resolved in keys and values.
fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut key = String::new();
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(e) = read_escape(&mut chars) {
                    key.push(e);
                }
            } else if c == '=' || c == ':' {
                break;
            } else {
                key.push(c);
            }
        }

        let value = unescape(chars.as_str().trim_start());
        map.insert(key.trim_end().to_string(), value);
    }

    map
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(e) = read_escape(&mut chars) {
                out.push(e);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Resolve the escape following a backslash, including `\uXXXX`.
fn read_escape(chars: &mut std::str::Chars<'_>) -> Option<char> {
    let c = chars.next()?;
    Some(match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{0c}',
        'u' => {
            let hex: String = chars.by_ref().take(4).collect();
            if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                return Some(char::REPLACEMENT_CHARACTER);
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        }
        other => other,
    })
}

fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '=' | ':' | '#' | '!') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn required<'a>(props: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    props
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| VaultError::CredentialError(format!("missing field '{key}'")))
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| VaultError::CredentialError(format!("field '{key}' is not a valid number")))
}

fn decode_fixed<const N: usize>(value: &str, key: &str) -> Result<[u8; N]> {
    let bytes = BASE64
        .decode(value.trim())
        .map_err(|e| VaultError::CredentialError(format!("field '{key}' is not base64: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        VaultError::CredentialError(format!(
            "field '{key}' must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(d) = fs::File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> VaultCredential {
        let mut cred = VaultCredential::new([1u8; SALT_LEN], [2u8; KEY_LEN], 200_000);
        cred.failed_attempts = 3;
        cred.lock_until_ms = 1_700_000_000_123;
        cred
    }

    #[test]
    fn properties_roundtrip() {
        let cred = sample();
        let text = cred.to_properties();
        let parsed = VaultCredential::from_properties(&text).unwrap();
        assert_eq!(parsed, cred);
    }

    #[test]
    fn base64_padding_is_escaped() {
        let text = sample().to_properties();
        let salt_line = text.lines().find(|l| l.starts_with("salt=")).unwrap();
        assert!(salt_line.ends_with("\\=\\="), "got {salt_line}");
    }

    #[test]
    fn loads_legacy_record_without_version() {
        // Shape of a record written by earlier releases.
        let salt = BASE64.encode([7u8; SALT_LEN]).replace('=', "\\=");
        let hash = BASE64.encode([9u8; KEY_LEN]).replace('=', "\\=");
        let text = format!(
            "#SecureVault metadata\n#Thu Oct 16 10:00:00 UTC 2025\n\
             lockUntil=0\nfailed=2\nhash={hash}\niters=200000\nsalt={salt}\n"
        );

        let cred = VaultCredential::from_properties(&text).unwrap();
        assert_eq!(cred.version, 1);
        assert_eq!(cred.salt, [7u8; SALT_LEN]);
        assert_eq!(cred.hash, [9u8; KEY_LEN]);
        assert_eq!(cred.iterations, 200_000);
        assert_eq!(cred.failed_attempts, 2);
        assert_eq!(cred.lock_until(), None);
    }

    #[test]
    fn unicode_escapes_are_decoded() {
        let text = format!(
            "#caf\u{00e9}\nsalt={}\nhash={}\niters\\u003d=1\\u0030\n",
            BASE64.encode([1u8; SALT_LEN]),
            BASE64.encode([2u8; KEY_LEN])
        );
        let props = parse_properties(&text);
        assert_eq!(props.get("iters=").map(String::as_str), Some("10"));
    }

    #[test]
    fn truncated_unicode_escape_becomes_replacement_char() {
        let props = parse_properties("note=ab\\u12");
        assert_eq!(props.get("note").map(String::as_str), Some("ab\u{fffd}"));
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let text = format!(
            "salt={}\nhash={}\niters=10\n",
            BASE64.encode([1u8; SALT_LEN]),
            BASE64.encode([2u8; KEY_LEN])
        );
        let cred = VaultCredential::from_properties(&text).unwrap();
        assert_eq!(cred.failed_attempts, 0);
        assert_eq!(cred.lock_until_ms, 0);
    }

    #[test]
    fn missing_hash_is_an_error() {
        let text = format!("salt={}\niters=10\n", BASE64.encode([1u8; SALT_LEN]));
        let err = VaultCredential::from_properties(&text).unwrap_err();
        assert!(err.to_string().contains("hash"), "got {err}");
    }

    #[test]
    fn wrong_salt_length_is_an_error() {
        let text = format!(
            "salt={}\nhash={}\niters=10\n",
            BASE64.encode([1u8; 8]),
            BASE64.encode([2u8; KEY_LEN])
        );
        assert!(matches!(
            VaultCredential::from_properties(&text),
            Err(VaultError::CredentialError(_))
        ));
    }

    #[test]
    fn newer_record_version_is_rejected() {
        let mut text = sample().to_properties();
        text = text.replace("version=1", "version=2");
        assert!(VaultCredential::from_properties(&text).is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = VaultCredential::path_in(dir.path());

        let cred = sample();
        cred.save(&path).unwrap();
        let loaded = VaultCredential::load(&path).unwrap();
        assert_eq!(loaded, cred);

        // No temp file left behind.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn load_missing_record_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let err = VaultCredential::load(&VaultCredential::path_in(dir.path())).unwrap_err();
        assert!(matches!(err, VaultError::VaultNotInitialized(_)));
    }

    #[cfg(unix)]
    #[test]
    fn saved_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = VaultCredential::path_in(dir.path());
        sample().save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn debug_hides_hash_and_salt() {
        let shown = format!("{:?}", sample());
        assert!(!shown.contains("hash"));
        assert!(!shown.contains("salt"));
    }
}
