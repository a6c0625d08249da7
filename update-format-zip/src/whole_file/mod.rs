mod error;

pub use error::Error;
pub(super) type Result<T> = std::result::Result<T, Error>;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::os::unix::prelude::FileExt;
use std::path::Path;

use log::{error, info};
use sha1::{Digest, Sha1};

use crate::hash_types::Sha1Digest;
use crate::progress::Progress;
use crate::verify_sig::{self, TrustedKey, RSA_MOD_BYTES};

const FOOTER_SIZE: usize = 6;
const EOCD_HEADER_SIZE: usize = 22;
const EOCD_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const BUFFER_SIZE: usize = 4096;

/// Outcome of a whole-file verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    Success,
    Failure,
}

/// Footer the signing tool appends after the RSA signature, all inside the
/// zip comment:
///
///   (2-byte signature start) $ff $ff (2-byte comment size)
///
/// Both offsets are measured from the end of the file.
#[derive(Debug)]
struct SignedFooter {
    signature_start: u16,
    comment_len: u16,
}

fn read_footer(file: &File, file_len: u64) -> Result<SignedFooter> {
    if file_len < (FOOTER_SIZE + EOCD_HEADER_SIZE) as u64 {
        return Err(Error::FileTooShort(file_len));
    }

    let mut footer = [0u8; FOOTER_SIZE];
    file.read_exact_at(&mut footer, file_len - FOOTER_SIZE as u64).map_err(Error::ReadFooter)?;

    if footer[2] != 0xff || footer[3] != 0xff {
        return Err(Error::MissingFooterSentinel(footer[2], footer[3]));
    }

    Ok(SignedFooter {
        signature_start: u16::from_le_bytes([footer[0], footer[1]]),
        comment_len: u16::from_le_bytes([footer[4], footer[5]]),
    })
}

// Read the EOCD record plus trailing comment, and reject a forged second
// EOCD marker. An attacker who smuggles the marker into the comment could
// point an end-scanning zip reader at forged central-directory entries the
// whole-file signature never covered.
fn read_eocd(file: &File, file_len: u64, footer: &SignedFooter) -> Result<Vec<u8>> {
    let eocd_size = footer.comment_len as u64 + EOCD_HEADER_SIZE as u64;
    if eocd_size > file_len {
        return Err(Error::EocdLongerThanFile {
            eocd_size,
            file_len,
        });
    }

    let mut eocd = vec![0u8; eocd_size as usize];
    file.read_exact_at(&mut eocd, file_len - eocd_size).map_err(Error::ReadEocd)?;

    if eocd[..4] != EOCD_MAGIC {
        return Err(Error::MissingEocdMagic);
    }
    for offset in 4..eocd.len().saturating_sub(3) {
        if eocd[offset..offset + 4] == EOCD_MAGIC {
            return Err(Error::EocdMagicRepeated(offset));
        }
    }

    Ok(eocd)
}

// Stream the signed range through sha1, reporting progress every time the
// fraction advances by more than 0.02 and once more at completion.
fn hash_signed_range(file: File, signed_len: u64, progress: &mut dyn Progress) -> Result<Sha1Digest> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0)).map_err(Error::ReadSignedData)?;

    let mut hasher = Sha1::new();
    let mut buf = [0u8; BUFFER_SIZE];

    let mut so_far = 0u64;
    let mut frac = -1.0f64;
    while so_far < signed_len {
        let chunk_len = BUFFER_SIZE.min((signed_len - so_far) as usize);
        reader.read_exact(&mut buf[..chunk_len]).map_err(Error::ReadSignedData)?;
        hasher.update(&buf[..chunk_len]);
        so_far += chunk_len as u64;

        let fraction = so_far as f64 / signed_len as f64;
        if fraction > frac + 0.02 || so_far == signed_len {
            progress.set(fraction);
            frac = fraction;
        }
    }

    Ok(Sha1Digest::from_bytes(hasher.finalize().into()))
}

fn verify_file_inner(path: &Path, keys: &[TrustedKey], progress: &mut dyn Progress) -> Result<()> {
    let file = File::open(path).map_err(Error::OpenFile)?;
    let file_len = file.metadata().map_err(Error::GetFileMetadata)?.len();

    let footer = read_footer(&file, file_len)?;
    info!("comment is {} bytes; signature {} bytes from end", footer.comment_len, footer.signature_start);

    // The signing tool places the 6-byte footer directly after the
    // signature block, both inside the comment.
    if (footer.signature_start as usize) < RSA_MOD_BYTES + FOOTER_SIZE {
        return Err(Error::SignatureTooShort(footer.signature_start));
    }
    if (footer.comment_len as usize) < RSA_MOD_BYTES + FOOTER_SIZE {
        return Err(Error::CommentTooShort(footer.comment_len));
    }

    let eocd = read_eocd(&file, file_len, &footer)?;

    // The signature covers everything up to the EOCD comment-length field;
    // the last two bytes of the record and the comment itself are excluded.
    let signed_len = file_len - eocd.len() as u64 + (EOCD_HEADER_SIZE - 2) as u64;
    let digest = hash_signed_range(file, signed_len, progress)?;

    let signature = &eocd[eocd.len() - FOOTER_SIZE - RSA_MOD_BYTES..eocd.len() - FOOTER_SIZE];
    if !verify_sig::verify_with_any_key(keys, &digest, signature) {
        return Err(Error::SignatureRejected(keys.len()));
    }

    Ok(())
}

/// Check the RSA signature embedded in the zip comment of the archive at
/// `path` against the trusted keys. Every failure collapses to
/// `VerifyResult::Failure`; diagnostic detail goes to the log.
pub fn verify_file(path: &Path, keys: &[TrustedKey], progress: &mut dyn Progress) -> VerifyResult {
    progress.set(0.0);

    match verify_file_inner(path, keys, progress) {
        Ok(()) => {
            info!("whole-file signature verified");
            VerifyResult::Success
        }
        Err(err) => {
            error!("failed to verify whole-file signature of {}: {err}", path.display());
            VerifyResult::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{signed_whole_file, test_keypair, RecordingProgress};

    use std::io::Write;
    use std::path::PathBuf;

    use tempfile::TempDir;

    // Deterministic filler so the signed range spans many read chunks.
    fn body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn write_package(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_verify_file_success() {
        let (private_key, trusted) = test_keypair(1);
        let package = signed_whole_file(&private_key, &body(100 * 1024), b"signed by the build system");

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        let mut progress = RecordingProgress::default();
        assert_eq!(verify_file(&path, &[trusted], &mut progress), VerifyResult::Success);

        progress.assert_monotone();
        assert_eq!(progress.fractions.first(), Some(&0.0));
        assert!(*progress.fractions.last().unwrap() >= 0.98);
    }

    #[test]
    fn test_verify_file_is_idempotent() {
        let (private_key, trusted) = test_keypair(2);
        let package = signed_whole_file(&private_key, &body(4096), b"");

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);
        let keys = [trusted];

        assert_eq!(verify_file(&path, &keys, &mut RecordingProgress::default()), VerifyResult::Success);
        assert_eq!(verify_file(&path, &keys, &mut RecordingProgress::default()), VerifyResult::Success);
        assert_eq!(std::fs::read(&path).unwrap(), package);
    }

    #[test]
    fn test_any_key_may_verify() {
        let (private_key, trusted_signer) = test_keypair(3);
        let (_, trusted_other) = test_keypair(4);
        let package = signed_whole_file(&private_key, &body(4096), b"");

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        let keys = [trusted_other.clone(), trusted_signer];
        assert_eq!(verify_file(&path, &keys, &mut RecordingProgress::default()), VerifyResult::Success);

        // The non-signing key alone must not accept the package.
        let keys = [trusted_other];
        assert_eq!(verify_file(&path, &keys, &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_broken_sentinel_fails_before_hashing() {
        let (private_key, trusted) = test_keypair(5);
        let mut package = signed_whole_file(&private_key, &body(8192), b"");
        let len = package.len();
        package[len - 3] = 0xfe;

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        let mut progress = RecordingProgress::default();
        assert_eq!(verify_file(&path, &[trusted], &mut progress), VerifyResult::Failure);

        // Only the initial reset is reported; no digest was computed.
        assert_eq!(progress.fractions, vec![0.0]);
    }

    #[test]
    fn test_hostile_second_eocd_marker() {
        let (private_key, trusted) = test_keypair(6);

        let mut comment_pad = vec![b'x'; 100];
        comment_pad.extend_from_slice(&[0x50, 0x4b, 0x05, 0x06]);
        comment_pad.extend_from_slice(&[b'x'; 16]);

        // The signature is recomputed over the unchanged signed range, so
        // only the hostile marker scan can reject this package.
        let package = signed_whole_file(&private_key, &body(8192), &comment_pad);

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_tampered_body_fails() {
        let (private_key, trusted) = test_keypair(7);
        let mut package = signed_whole_file(&private_key, &body(8192), b"");
        package[100] ^= 0x01;

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_signature_start_too_small() {
        let (private_key, trusted) = test_keypair(8);
        let mut package = signed_whole_file(&private_key, &body(4096), b"");
        let len = package.len();

        // Claim the signature block is only 100 bytes deep.
        package[len - 6..len - 4].copy_from_slice(&100u16.to_le_bytes());

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_comment_len_beyond_file_start() {
        let (private_key, trusted) = test_keypair(9);
        let mut package = signed_whole_file(&private_key, &body(512), b"");
        let len = package.len();

        // Comment claims to be longer than the whole file.
        package[len - 2..].copy_from_slice(&u16::MAX.to_le_bytes());

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_missing_eocd_magic() {
        let (private_key, trusted) = test_keypair(10);
        let body = body(4096);
        let mut package = signed_whole_file(&private_key, &body, b"");

        // Corrupt the magic where the EOCD record starts.
        package[body.len()] = 0x51;

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &package);

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_file_too_short() {
        let (_, trusted) = test_keypair(11);

        let dir = TempDir::new().unwrap();
        let path = write_package(&dir, "update.zip", &[0u8; 27]);

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }

    #[test]
    fn test_missing_file() {
        let (_, trusted) = test_keypair(12);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-package.zip");

        assert_eq!(verify_file(&path, &[trusted], &mut RecordingProgress::default()), VerifyResult::Failure);
    }
}
