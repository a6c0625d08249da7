mod error;

pub use error::Error;
pub(super) type Result<T> = std::result::Result<T, Error>;

use std::fs;

use log::debug;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::pkcs1v15;
use rsa::signature::hazmat::PrehashVerifier;
use rsa::traits::PublicKeyParts;
use sha1::Sha1;

use crate::hash_types::Sha1Digest;

/// Modulus size the verifier accepts. Update packages are signed with
/// RSA-2048 keys.
pub const RSA_MOD_BYTES: usize = 256;

#[derive(Debug)]
pub enum KeyType {
    KeyTypeNone,
    KeyTypePkcs1,
    KeyTypePkcs8,
}

// We rely on RSA PKCS1v1.5 over sha1 digests, with public keys carried as
// either PKCS1 or PKCS8 PEM.

/// An RSA public key the device is provisioned to trust. Construction
/// rejects any modulus that is not exactly RSA_MOD_BYTES wide.
#[derive(Debug, Clone)]
pub struct TrustedKey(pkcs1v15::VerifyingKey<Sha1>);

impl TrustedKey {
    pub fn new(public_key: RsaPublicKey) -> Result<Self> {
        if public_key.size() != RSA_MOD_BYTES {
            return Err(Error::WrongModulusSize {
                expected: RSA_MOD_BYTES,
                actual: public_key.size(),
            });
        }
        Ok(Self(pkcs1v15::VerifyingKey::new(public_key)))
    }

    // Verify an RSA_MOD_BYTES-long signature block over a sha1 digest.
    pub fn verify_digest(&self, digest: &Sha1Digest, signature: &[u8]) -> Result<()> {
        if signature.len() != RSA_MOD_BYTES {
            return Err(Error::WrongSignatureSize {
                expected: RSA_MOD_BYTES,
                actual: signature.len(),
            });
        }

        self.0
            .verify_prehash(
                digest.as_ref(),
                &pkcs1v15::Signature::try_from(signature).map_err(Error::InvalidPkcs1v15Signature)?,
            )
            .map_err(Error::CouldNotVerifySignature)
    }
}

// Try the trusted keys in order; the first key that verifies wins. The
// rejecting keys only show up in the debug log.
pub fn verify_with_any_key(keys: &[TrustedKey], digest: &Sha1Digest, signature: &[u8]) -> bool {
    for (slot, key) in keys.iter().enumerate() {
        match key.verify_digest(digest, signature) {
            Ok(()) => {
                debug!("signature verified with key in slot {slot}");
                return true;
            }
            Err(err) => {
                debug!("key in slot {slot} rejected signature: {err}");
            }
        }
    }

    false
}

pub fn get_public_key_pkcs_pem(public_key_path: &str, key_type: KeyType) -> Result<RsaPublicKey> {
    let public_key_buf = fs::read_to_string(public_key_path).map_err(Error::ReadPublicKey)?;
    match key_type {
        KeyType::KeyTypePkcs1 => RsaPublicKey::from_pkcs1_pem(public_key_buf.as_str()).map_err(Error::DeserialisePkcs1),
        KeyType::KeyTypePkcs8 => RsaPublicKey::from_public_key_pem(public_key_buf.as_str()).map_err(Error::DecodePublicKey),
        KeyType::KeyTypeNone => Err(Error::InvalidPublicKeyType),
    }
}

pub fn load_trusted_key_pem(public_key_path: &str, key_type: KeyType) -> Result<TrustedKey> {
    TrustedKey::new(get_public_key_pkcs_pem(public_key_path, key_type)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sha1_of, sign_digest, test_keypair};

    use std::io::Write;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rsa::RsaPrivateKey;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};

    const TESTDATA: &str = "test data for verifying signature";

    #[test]
    fn test_verify_digest() {
        let (private_key, trusted) = test_keypair(17);

        let digest = sha1_of(TESTDATA.as_bytes());
        let signature = sign_digest(&private_key, &digest);

        trusted.verify_digest(&digest, &signature).unwrap_or_else(|error| {
            panic!("failed to verify data: {:?}", error);
        });

        // A different digest must not verify with the same signature.
        let other = sha1_of(b"some other data");
        assert!(trusted.verify_digest(&other, &signature).is_err());
    }

    #[test]
    fn test_verify_digest_rejects_short_signature() {
        let (private_key, trusted) = test_keypair(18);

        let digest = sha1_of(TESTDATA.as_bytes());
        let signature = sign_digest(&private_key, &digest);

        assert!(matches!(
            trusted.verify_digest(&digest, &signature[1..]),
            Err(Error::WrongSignatureSize { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_modulus_size() {
        let mut rng = StdRng::seed_from_u64(19);
        let small_key = RsaPrivateKey::new(&mut rng, 1024).unwrap_or_else(|error| {
            panic!("failed to generate test key: {:?}", error);
        });

        assert!(matches!(
            TrustedKey::new(RsaPublicKey::from(&small_key)),
            Err(Error::WrongModulusSize { .. })
        ));
    }

    #[test]
    fn test_verify_with_any_key_tries_keys_in_order() {
        let (signing_key, trusted_signer) = test_keypair(20);
        let (_, trusted_other) = test_keypair(21);

        let digest = sha1_of(TESTDATA.as_bytes());
        let signature = sign_digest(&signing_key, &digest);

        // The matching key is found behind a non-matching one.
        assert!(verify_with_any_key(&[trusted_other.clone(), trusted_signer], &digest, &signature));
        assert!(!verify_with_any_key(&[trusted_other], &digest, &signature));
        assert!(!verify_with_any_key(&[], &digest, &signature));
    }

    #[test]
    fn test_get_public_key_pkcs_pem() {
        let (private_key, _) = test_keypair(22);
        let public_key = RsaPublicKey::from(&private_key);

        let dir = tempfile::tempdir().unwrap();

        let pkcs1_path = dir.path().join("public_key_pkcs1.pem");
        let mut pkcs1_file = std::fs::File::create(&pkcs1_path).unwrap();
        pkcs1_file.write_all(public_key.to_pkcs1_pem(LineEnding::LF).unwrap().as_bytes()).unwrap();

        let pkcs8_path = dir.path().join("public_key_pkcs8.pem");
        let mut pkcs8_file = std::fs::File::create(&pkcs8_path).unwrap();
        pkcs8_file.write_all(public_key.to_public_key_pem(LineEnding::LF).unwrap().as_bytes()).unwrap();

        let loaded_pkcs1 = get_public_key_pkcs_pem(pkcs1_path.to_str().unwrap(), KeyType::KeyTypePkcs1).unwrap();
        assert_eq!(loaded_pkcs1, public_key);

        let loaded_pkcs8 = get_public_key_pkcs_pem(pkcs8_path.to_str().unwrap(), KeyType::KeyTypePkcs8).unwrap();
        assert_eq!(loaded_pkcs8, public_key);

        assert!(matches!(
            get_public_key_pkcs_pem(pkcs1_path.to_str().unwrap(), KeyType::KeyTypeNone),
            Err(Error::InvalidPublicKeyType)
        ));

        // Wrong encoding for the requested type.
        assert!(get_public_key_pkcs_pem(pkcs8_path.to_str().unwrap(), KeyType::KeyTypePkcs1).is_err());

        let trusted = load_trusted_key_pem(pkcs8_path.to_str().unwrap(), KeyType::KeyTypePkcs8);
        assert!(trusted.is_ok());
    }
}
