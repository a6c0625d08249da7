mod error;

pub use error::Error;
pub(super) type Result<T> = std::result::Result<T, Error>;

use log::{debug, error, info, warn};
use sha1::{Digest, Sha1};

use crate::archive::{ArchiveRead, EntryInfo};
use crate::hash_types::Sha1Digest;
use crate::progress::Progress;
use crate::verify_sig::{self, TrustedKey, RSA_MOD_BYTES};

const META_INF_PREFIX: &[u8] = b"META-INF/";
const RSA_SUFFIX: &[u8] = b".RSA";
const SF_SUFFIX: &[u8] = b".SF";
const MANIFEST_NAME: &[u8] = b"META-INF/MANIFEST.MF";

const NAME_PREFIX: &str = "Name: ";
const DIGEST_PREFIX: &str = "SHA1-Digest: ";
const DIGEST_MANIFEST_PREFIX: &str = "SHA1-Digest-Manifest: ";

/// In-memory cap for manifest and signature metadata entries. A crafted
/// central directory must not be able to force an unbounded allocation.
const MAX_METADATA_LEN: u64 = 64 << 20;

/// Verify the JAR-style signature chain of an open archive: a signed `.SF`
/// file, the manifest digest it carries, and a manifest stanza for every
/// entry that needs one. Every failure collapses to `false`; diagnostic
/// detail goes to the log.
pub fn verify_jar_signature(archive: &mut dyn ArchiveRead, keys: &[TrustedKey], progress: &mut dyn Progress) -> bool {
    match verify_jar(archive, keys, progress) {
        Ok(()) => true,
        Err(err) => {
            error!("failed to verify archive signature: {err}");
            false
        }
    }
}

fn verify_jar(archive: &mut dyn ArchiveRead, keys: &[TrustedKey], progress: &mut dyn Progress) -> Result<()> {
    let sf_entry = find_signed_signature_file(archive, keys)?;
    let mf_entry = verify_manifest_digest(archive, &sf_entry)?;
    verify_archive_entries(archive, &mf_entry, progress)
}

fn lossy(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

// strtok-style tokenizer: split on any run of \r or \n, never yielding
// empty lines. Well-formed manifests are \r\n-terminated but lone
// terminators are tolerated.
fn lines(buf: &[u8]) -> impl Iterator<Item = &[u8]> {
    buf.split(|byte| *byte == b'\r' || *byte == b'\n').filter(|line| !line.is_empty())
}

fn strip_prefix_ignore_ascii_case<'a>(line: &'a [u8], prefix: &str) -> Option<&'a [u8]> {
    let prefix = prefix.as_bytes();
    if line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn ends_with_ignore_ascii_case(name: &[u8], suffix: &[u8]) -> bool {
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

// Signature metadata is exempt from manifest coverage. Unlike the .RSA
// selection below, this compares case-insensitively.
fn is_signature_entry(name: &[u8]) -> bool {
    name.len() >= META_INF_PREFIX.len()
        && name[..META_INF_PREFIX.len()].eq_ignore_ascii_case(META_INF_PREFIX)
        && (ends_with_ignore_ascii_case(name, RSA_SUFFIX) || ends_with_ignore_ascii_case(name, SF_SUFFIX))
}

// Read a metadata entry fully into memory, checking its integrity first.
fn slurp_entry(archive: &mut dyn ArchiveRead, entry: &EntryInfo) -> Result<Vec<u8>> {
    if entry.size() > MAX_METADATA_LEN {
        return Err(Error::MetadataTooLarge(lossy(entry.name()), entry.size()));
    }
    if !archive.is_intact(entry.index()) {
        return Err(Error::CorruptEntry(lossy(entry.name())));
    }

    let mut buf = Vec::with_capacity(entry.size() as usize);
    if !archive.stream_entry(entry.index(), &mut |chunk| buf.extend_from_slice(chunk)) {
        return Err(Error::ReadEntry(lossy(entry.name())));
    }
    Ok(buf)
}

// Byte-weighted progress accounting across all digested entries.
struct Tally<'a> {
    done_bytes: &'a mut u64,
    total_bytes: u64,
    progress: &'a mut dyn Progress,
}

impl Tally<'_> {
    fn add(&mut self, bytes: u64) {
        *self.done_bytes += bytes;
        if self.total_bytes > 0 {
            self.progress.set(*self.done_bytes as f64 / self.total_bytes as f64);
        }
    }
}

// Sha1 an entry's contents, optionally folding the streamed bytes into the
// caller's progress accounting.
fn digest_entry(archive: &mut dyn ArchiveRead, entry: &EntryInfo, mut tally: Option<Tally<'_>>) -> Result<Sha1Digest> {
    let mut hasher = Sha1::new();
    let streamed = archive.stream_entry(entry.index(), &mut |chunk| {
        hasher.update(chunk);
        if let Some(tally) = tally.as_mut() {
            tally.add(chunk.len() as u64);
        }
    });
    if !streamed {
        return Err(Error::DigestEntry(lossy(entry.name())));
    }

    Ok(Sha1Digest::from_bytes(hasher.finalize().into()))
}

// Find a META-INF/X.SF signature file signed by a matching X.RSA entry.
// Candidates are tried in index order; the first pair that verifies wins.
fn find_signed_signature_file(archive: &mut dyn ArchiveRead, keys: &[TrustedKey]) -> Result<EntryInfo> {
    for index in 0..archive.entry_count() {
        let rsa_entry = archive.entry_at(index).ok_or(Error::MissingEntryIndex(index))?;
        let rsa_name = rsa_entry.name().to_vec();

        // The prefix and suffix matches here are deliberately
        // case-sensitive; the signing tool emits upper-case suffixes.
        if rsa_entry.size() < RSA_MOD_BYTES as u64 || !rsa_name.starts_with(META_INF_PREFIX) || !rsa_name.ends_with(RSA_SUFFIX) {
            continue;
        }

        // Replace .RSA with .SF
        let mut sf_name = rsa_name[..rsa_name.len() - RSA_SUFFIX.len()].to_vec();
        sf_name.extend_from_slice(SF_SUFFIX);

        let Some(sf_entry) = archive.find_entry(&sf_name) else {
            warn!("missing signature file {}", lossy(&sf_name));
            continue;
        };

        let sf_digest = match digest_entry(archive, &sf_entry, None) {
            Ok(digest) => digest,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        let rsa_buf = match slurp_entry(archive, &rsa_entry) {
            Ok(buf) => buf,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        if rsa_buf.len() < RSA_MOD_BYTES {
            warn!("short signature block in {}", lossy(&rsa_name));
            continue;
        }

        // The raw RSA signature sits in the last RSA_MOD_BYTES of the
        // signature blob.
        let signature = &rsa_buf[rsa_buf.len() - RSA_MOD_BYTES..];
        if verify_sig::verify_with_any_key(keys, &sf_digest, signature) {
            info!("verified {}", lossy(&rsa_name));
            return Ok(sf_entry);
        }
        warn!("can't verify {}", lossy(&rsa_name));
    }

    Err(Error::NoSignature(archive.entry_count()))
}

// Check META-INF/MANIFEST.MF against the SHA1-Digest-Manifest header of a
// verified signature file.
fn verify_manifest_digest(archive: &mut dyn ArchiveRead, sf_entry: &EntryInfo) -> Result<EntryInfo> {
    let sf_buf = slurp_entry(archive, sf_entry)?;

    let mut expected = None;
    for line in lines(&sf_buf) {
        if let Some(value) = strip_prefix_ignore_ascii_case(line, DIGEST_MANIFEST_PREFIX) {
            expected = Some(Sha1Digest::from_base64(value).map_err(|_| Error::InvalidBase64(lossy(sf_entry.name())))?);
            break;
        }
    }
    let expected = expected.ok_or(Error::MissingDigestManifestHeader)?;

    let mf_entry = archive.find_entry(MANIFEST_NAME).ok_or(Error::NoManifest)?;
    let actual = digest_entry(archive, &mf_entry, None)?;
    if expected != actual {
        return Err(Error::WrongManifestDigest);
    }

    info!("verified {}", lossy(MANIFEST_NAME));
    Ok(mf_entry)
}

// Walk MANIFEST.MF stanza by stanza, digesting each named entry, then make
// sure every entry that needed coverage got it.
fn verify_archive_entries(archive: &mut dyn ArchiveRead, mf_entry: &EntryInfo, progress: &mut dyn Progress) -> Result<()> {
    let mf_buf = slurp_entry(archive, mf_entry)?;

    // Mark every entry the manifest must account for. Stanzas clear the
    // marks; any mark left at the end is a coverage gap.
    //
    // Exempt: directories, the manifest itself, and signature metadata.
    let mut unverified = vec![false; archive.entry_count()];
    let mut total_bytes = 0u64;
    for index in 0..archive.entry_count() {
        let entry = archive.entry_at(index).ok_or(Error::MissingEntryIndex(index))?;
        if index == mf_entry.index() {
            debug!("skipping manifest {}", lossy(entry.name()));
        } else if entry.is_dir() {
            debug!("skipping directory {}", lossy(entry.name()));
        } else if is_signature_entry(entry.name()) {
            debug!("skipping signature {}", lossy(entry.name()));
        } else {
            unverified[index] = true;
            total_bytes += entry.size();
        }
    }

    let mut done_bytes = 0u64;
    let mut pending_name: Option<Vec<u8>> = None;
    for line in lines(&mf_buf) {
        if let Some(value) = strip_prefix_ignore_ascii_case(line, NAME_PREFIX) {
            // "Name:" introducing a new stanza
            if let Some(prev) = pending_name {
                return Err(Error::MissingDigestLine(lossy(&prev)));
            }
            pending_name = Some(value.to_vec());
        } else if let Some(tail) = line.strip_prefix(b" ") {
            // Continuing a long name; the content is appended verbatim.
            match pending_name.as_mut() {
                Some(name) => name.extend_from_slice(tail),
                None => return Err(Error::UnexpectedContinuation(lossy(tail))),
            }
        } else if let Some(value) = strip_prefix_ignore_ascii_case(line, DIGEST_PREFIX) {
            // "SHA1-Digest:" closing the current stanza
            let name = pending_name.take().ok_or_else(|| Error::UnexpectedDigestLine(lossy(value)))?;

            let entry = archive.find_entry(&name).ok_or_else(|| Error::MissingFile(lossy(&name)))?;
            if !archive.is_intact(entry.index()) {
                return Err(Error::CorruptEntry(lossy(&name)));
            }
            if !unverified[entry.index()] {
                // Already verified, exempt, or a directory: nothing should
                // name this entry.
                return Err(Error::UnexpectedFile(lossy(&name)));
            }

            let expected = Sha1Digest::from_base64(value).map_err(|_| Error::InvalidBase64(lossy(&name)))?;
            let actual = digest_entry(
                archive,
                &entry,
                Some(Tally {
                    done_bytes: &mut done_bytes,
                    total_bytes,
                    progress,
                }),
            )?;
            if expected != actual {
                return Err(Error::WrongDigest(lossy(&name)));
            }

            info!("verified {}", lossy(&name));
            unverified[entry.index()] = false;
        }
        // Anything else (version headers, unknown attributes) is ignored.
    }

    if let Some(name) = pending_name {
        return Err(Error::MissingDigestLine(lossy(&name)));
    }

    if let Some(index) = unverified.iter().position(|pending| *pending) {
        let entry = archive.entry_at(index).ok_or(Error::MissingEntryIndex(index))?;
        return Err(Error::NoDigestForEntry(lossy(entry.name())));
    }

    Ok(())
}
