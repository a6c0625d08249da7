//! Shared fixtures for the crate tests: deterministic signing keys, signed
//! archive builders, and a recording progress sink.

use std::io::{Cursor, Write};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::hash_types::Sha1Digest;
use crate::progress::Progress;
use crate::verify_sig::{TrustedKey, RSA_MOD_BYTES};

const FOOTER_SIZE: usize = 6;
const EOCD_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

pub fn test_keypair(seed: u64) -> (RsaPrivateKey, TrustedKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap_or_else(|error| {
        panic!("failed to generate test key: {:?}", error);
    });
    let trusted = TrustedKey::new(RsaPublicKey::from(&private_key)).unwrap_or_else(|error| {
        panic!("failed to wrap test key: {:?}", error);
    });
    (private_key, trusted)
}

pub fn sha1_of(data: &[u8]) -> Sha1Digest {
    Sha1Digest::from_bytes(Sha1::digest(data).into())
}

pub fn sign_digest(private_key: &RsaPrivateKey, digest: &Sha1Digest) -> Vec<u8> {
    let signature = private_key.sign(Pkcs1v15Sign::new::<Sha1>(), digest.as_ref()).unwrap_or_else(|error| {
        panic!("failed to sign digest: {:?}", error);
    });
    assert_eq!(signature.len(), RSA_MOD_BYTES);
    signature
}

/// Progress sink that records every reported fraction.
#[derive(Default)]
pub struct RecordingProgress {
    pub fractions: Vec<f64>,
}

impl Progress for RecordingProgress {
    fn set(&mut self, fraction: f64) {
        self.fractions.push(fraction);
    }
}

impl RecordingProgress {
    /// Every recorded sequence must be bounded and non-decreasing.
    pub fn assert_monotone(&self) {
        let mut last = 0.0f64;
        for fraction in &self.fractions {
            assert!((0.0..=1.0).contains(fraction), "fraction {fraction} out of bounds");
            assert!(*fraction >= last, "fraction {fraction} after {last}");
            last = *fraction;
        }
    }
}

/// Assemble a whole-file-signed archive: `body`, a minimal EOCD record, and
/// a comment holding `comment_pad`, the RSA signature, and the 6-byte
/// footer. The signature covers the body plus the first 20 EOCD bytes.
pub fn signed_whole_file(private_key: &RsaPrivateKey, body: &[u8], comment_pad: &[u8]) -> Vec<u8> {
    let comment_len = comment_pad.len() + RSA_MOD_BYTES + FOOTER_SIZE;
    assert!(comment_len <= u16::MAX as usize);

    let mut file = body.to_vec();
    file.extend_from_slice(&EOCD_MAGIC);
    file.extend_from_slice(&[0u8; 16]);

    let digest = sha1_of(&file);
    let signature = sign_digest(private_key, &digest);

    file.extend_from_slice(&(comment_len as u16).to_le_bytes());
    file.extend_from_slice(comment_pad);
    file.extend_from_slice(&signature);

    let signature_start = (RSA_MOD_BYTES + FOOTER_SIZE) as u16;
    file.extend_from_slice(&signature_start.to_le_bytes());
    file.extend_from_slice(&[0xff, 0xff]);
    file.extend_from_slice(&(comment_len as u16).to_le_bytes());

    file
}

/// Build an in-memory zip from `(name, contents)` pairs. Entries are stored
/// uncompressed so tests can poke at the raw bytes.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap_or_else(|error| {
                panic!("failed to add directory {name}: {error:?}");
            });
        } else {
            writer.start_file(*name, options).unwrap_or_else(|error| {
                panic!("failed to start file {name}: {error:?}");
            });
            writer.write_all(contents).unwrap_or_else(|error| {
                panic!("failed to write {name}: {error:?}");
            });
        }
    }

    let mut cursor = writer.finish().unwrap_or_else(|error| {
        panic!("failed to finish archive: {:?}", error);
    });
    cursor.set_position(0);
    cursor
}
