//! Binary vault item format.
//!
//! A `.sv` item has this layout (multi-byte integers big-endian):
//!
//! ```text
//! [SVLT: 4 bytes][version: 1 byte][iv: 12 bytes][name_len: 2 bytes][name][original_size: 8 bytes][ciphertext][tag: 16 bytes]
//! ```
//!
//! - **Magic** (`SVLT`): identifies the file as a SecureVault item.
//! - **Version**: format version (currently `1`).
//! - **IV**: fresh random AES-GCM IV for this item.
//! - **Name**: UTF-8 original filename, at most 65 535 bytes.
//! - **Original size**: plaintext length in bytes.
//! - **Ciphertext + tag**: AES-256-GCM output, tag appended.
//!
//! The header is self-describing so an item can be restored without any
//! other metadata.  Plaintext is streamed in fixed-size chunks in both
//! directions, so memory use does not depend on the item size.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::crypto::encryption::{GcmAuthenticator, GcmKeystream, MAX_PAYLOAD_LEN};
use crate::crypto::{SessionKey, IV_LEN, TAG_LEN};
use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault item.
pub const MAGIC: &[u8; 4] = b"SVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// File extension of vault items.
pub const ITEM_EXTENSION: &str = "sv";

/// Longest original name the 2-byte length field can describe.
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// Plaintext is processed in chunks of this size.
pub const CHUNK_LEN: usize = 8 * 1024;

/// Fixed-size part of the header: magic + version + iv + name_len + original_size.
const FIXED_HEADER_LEN: usize = 4 + 1 + IV_LEN + 2 + 8;

// ---------------------------------------------------------------------------
// ItemHeader
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a vault item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHeader {
    /// The AES-GCM IV used for this item.
    pub iv: [u8; IV_LEN],

    /// Filename of the plaintext when it was added.
    pub original_name: String,

    /// Plaintext length in bytes.
    pub original_size: u64,
}

impl ItemHeader {
    /// Number of bytes the header occupies on disk.
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LEN + self.original_name.len()
    }

    fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let name_len = u16::try_from(self.original_name.len())
            .map_err(|_| VaultError::NameTooLong(self.original_name.len()))?;

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(MAGIC); // 4 bytes
        buf.push(CURRENT_VERSION); // 1 byte
        buf.extend_from_slice(&self.iv); // 12 bytes
        buf.extend_from_slice(&name_len.to_be_bytes()); // 2 bytes BE
        buf.extend_from_slice(self.original_name.as_bytes()); // name
        buf.extend_from_slice(&self.original_size.to_be_bytes()); // 8 bytes BE

        out.write_all(&buf)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read and validate an item header, leaving `input` positioned at the
/// first ciphertext byte.
///
/// Nothing is decrypted, so this needs no key.
pub fn read_header<R: Read>(input: &mut R) -> Result<ItemHeader> {
    let mut magic = [0u8; 4];
    let got = read_full(input, &mut magic)?;
    if got < magic.len() || &magic != MAGIC {
        return Err(VaultError::BadMagic);
    }

    let mut version = [0u8; 1];
    read_field(input, &mut version, "version")?;
    if version[0] != CURRENT_VERSION {
        return Err(VaultError::UnsupportedVersion(version[0]));
    }

    let mut iv = [0u8; IV_LEN];
    read_field(input, &mut iv, "iv")?;

    let mut name_len = [0u8; 2];
    read_field(input, &mut name_len, "name length")?;
    let mut name = vec![0u8; usize::from(u16::from_be_bytes(name_len))];
    read_field(input, &mut name, "name")?;
    let original_name = String::from_utf8(name)
        .map_err(|_| VaultError::Truncated("original name is not valid UTF-8".into()))?;

    let mut size = [0u8; 8];
    read_field(input, &mut size, "original size")?;

    Ok(ItemHeader {
        iv,
        original_name,
        original_size: u64::from_be_bytes(size),
    })
}

/// Encrypt `plaintext` into a complete vault item written to `out`.
///
/// Generates a fresh IV from `rng`, writes the header, then streams the
/// plaintext through AES-256-GCM in `CHUNK_LEN` pieces and appends the
/// tag.  Fails with `NameTooLong` before writing anything if the name
/// does not fit, and with `SizeMismatch` if the stream length differs
/// from `original_size`.
pub fn encode<R, W, G>(
    plaintext: &mut R,
    original_name: &str,
    original_size: u64,
    key: &SessionKey,
    rng: &mut G,
    out: &mut W,
) -> Result<ItemHeader>
where
    R: Read,
    W: Write,
    G: CryptoRng + ?Sized,
{
    if original_name.len() > MAX_NAME_LEN {
        return Err(VaultError::NameTooLong(original_name.len()));
    }
    if original_size > MAX_PAYLOAD_LEN {
        return Err(VaultError::PayloadTooLarge(original_size));
    }

    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let header = ItemHeader {
        iv,
        original_name: original_name.to_string(),
        original_size,
    };
    header.write_to(out)?;

    let mut keystream = GcmKeystream::new(key, &iv);
    let mut auth = GcmAuthenticator::new(key, &iv);
    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    let mut total: u64 = 0;

    loop {
        let n = read_full(plaintext, &mut buf)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > original_size {
            return Err(VaultError::SizeMismatch {
                expected: original_size,
                actual: total,
            });
        }

        let chunk = &mut buf[..n];
        keystream.apply(chunk)?;
        auth.update(chunk);
        out.write_all(chunk)?;
    }

    if total != original_size {
        return Err(VaultError::SizeMismatch {
            expected: original_size,
            actual: total,
        });
    }

    out.write_all(&auth.finish())?;
    out.flush()?;
    Ok(header)
}

/// Decrypt a vault item from `input` into `out`.
///
/// The whole ciphertext is authenticated before a single plaintext byte
/// is produced: a first pass runs GHASH over the ciphertext and checks
/// the tag, and only then a second pass decrypts.  The second pass
/// re-checks the tag, so an item modified between passes also fails
/// with `AuthenticationFailure`.
pub fn decode<R, W>(input: &mut R, key: &SessionKey, out: &mut W) -> Result<ItemHeader>
where
    R: Read + Seek,
    W: Write,
{
    let header = read_header(input)?;
    let body_start = input.stream_position()?;
    let end = input.seek(SeekFrom::End(0))?;

    let body_len = end.saturating_sub(body_start);
    if body_len < TAG_LEN as u64 {
        return Err(VaultError::Truncated("missing authentication tag".into()));
    }
    let ciphertext_len = body_len - TAG_LEN as u64;
    if ciphertext_len != header.original_size {
        return Err(VaultError::SizeMismatch {
            expected: header.original_size,
            actual: ciphertext_len,
        });
    }

    let mut tag = [0u8; TAG_LEN];
    input.seek(SeekFrom::Start(body_start + ciphertext_len))?;
    input.read_exact(&mut tag)?;

    // Pass 1: authenticate only.
    input.seek(SeekFrom::Start(body_start))?;
    let mut auth = GcmAuthenticator::new(key, &header.iv);
    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    let mut remaining = ciphertext_len;
    while remaining > 0 {
        let n = next_chunk_len(remaining);
        input.read_exact(&mut buf[..n])?;
        auth.update(&buf[..n]);
        remaining -= n as u64;
    }
    auth.verify(&tag)?;

    // Pass 2: decrypt.
    input.seek(SeekFrom::Start(body_start))?;
    let mut keystream = GcmKeystream::new(key, &header.iv);
    let mut auth = GcmAuthenticator::new(key, &header.iv);
    let mut remaining = ciphertext_len;
    while remaining > 0 {
        let n = next_chunk_len(remaining);
        let chunk = &mut buf[..n];
        input.read_exact(chunk)?;
        auth.update(chunk);
        keystream.apply(chunk)?;
        out.write_all(chunk)?;
        remaining -= n as u64;
    }
    auth.verify(&tag)?;

    out.flush()?;
    Ok(header)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn next_chunk_len(remaining: u64) -> usize {
    usize::try_from(remaining).map_or(CHUNK_LEN, |r| r.min(CHUNK_LEN))
}

/// Read until `buf` is full or the stream ends; returns the byte count.
fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn read_field<R: Read>(input: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    if read_full(input, buf)? < buf.len() {
        return Err(VaultError::Truncated(format!("header ends inside {field}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn key() -> SessionKey {
        SessionKey::new([0x24; 32])
    }

    fn seal(plaintext: &[u8], name: &str) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = Vec::new();
        encode(
            &mut Cursor::new(plaintext),
            name,
            plaintext.len() as u64,
            &key(),
            &mut rng,
            &mut out,
        )
        .unwrap();
        out
    }

    #[test]
    fn header_layout_is_big_endian() {
        let item = seal(b"abc", "n.txt");

        assert_eq!(&item[0..4], b"SVLT");
        assert_eq!(item[4], 1);
        // name_len follows the 12-byte IV
        assert_eq!(&item[17..19], &[0x00, 0x05]);
        assert_eq!(&item[19..24], b"n.txt");
        assert_eq!(&item[24..32], &[0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(item.len(), 32 + 3 + TAG_LEN);
    }

    #[test]
    fn read_header_parses_fields() {
        let item = seal(b"hello", "greeting.txt");
        let mut cursor = Cursor::new(&item);
        let header = read_header(&mut cursor).unwrap();

        assert_eq!(header.original_name, "greeting.txt");
        assert_eq!(header.original_size, 5);
        assert_eq!(&header.iv[..], &item[5..17]);
        assert_eq!(cursor.position() as usize, header.encoded_len());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut item = seal(b"x", "x");
        item[0] = b'X';
        let err = read_header(&mut Cursor::new(&item)).unwrap_err();
        assert!(matches!(err, VaultError::BadMagic));
    }

    #[test]
    fn short_file_is_bad_magic() {
        let err = read_header(&mut Cursor::new(b"SV")).unwrap_err();
        assert!(matches!(err, VaultError::BadMagic));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut item = seal(b"x", "x");
        item[4] = 2;
        let err = decode(&mut Cursor::new(&item), &key(), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedVersion(2)));
    }

    #[test]
    fn header_cut_short_is_truncated() {
        let item = seal(b"payload", "some-name.bin");
        let err = read_header(&mut Cursor::new(&item[..20])).unwrap_err();
        assert!(matches!(err, VaultError::Truncated(_)));
    }

    #[test]
    fn missing_tag_is_truncated() {
        let item = seal(b"", "empty");
        let cut = &item[..item.len() - 1];
        let err = decode(&mut Cursor::new(cut), &key(), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, VaultError::Truncated(_)));
    }

    #[test]
    fn encode_rejects_short_stream() {
        let mut rng = StdRng::seed_from_u64(2);
        let err = encode(
            &mut Cursor::new(b"abc"),
            "a",
            10,
            &key(),
            &mut rng,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VaultError::SizeMismatch {
                expected: 10,
                actual: 3
            }
        ));
    }

    #[test]
    fn encode_rejects_long_stream() {
        let mut rng = StdRng::seed_from_u64(2);
        let data = vec![1u8; CHUNK_LEN + 1];
        let err = encode(
            &mut Cursor::new(&data),
            "a",
            4,
            &key(),
            &mut rng,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::SizeMismatch { expected: 4, .. }));
    }

    #[test]
    fn decode_reports_header() {
        let item = seal(b"contents", "report.pdf");
        let mut out = Vec::new();
        let header = decode(&mut Cursor::new(&item), &key(), &mut out).unwrap();
        assert_eq!(header.original_name, "report.pdf");
        assert_eq!(header.original_size, 8);
        assert_eq!(out, b"contents");
    }

    #[test]
    fn tampered_item_writes_no_plaintext() {
        let mut item = seal(&[0x61; 100], "a.txt");
        let last = item.len() - 1;
        item[last] ^= 0x01;

        let mut out = Vec::new();
        let err = decode(&mut Cursor::new(&item), &key(), &mut out).unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailure));
        assert!(out.is_empty());
    }
}
