use std::fmt;

#[rustfmt::skip]
use ct_codecs::{
    Error as CodecError,

    Base64NoPadding,
    Hex,

    Encoder,
    Decoder
};

pub const SHA_DIGEST_SIZE: usize = 20;

/// Bytes the base64 decoder skips over inside digest values.
const BASE64_IGNORE: &[u8] = b" \t\r\n";

#[derive(Debug)]
pub enum Error {
    Decode(CodecError),
    InvalidDigestLength {
        expected: usize,
        actual: usize,
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode(err) => write!(fmt, "failed to decode: {}", err),
            Error::InvalidDigestLength {
                expected,
                actual,
            } => {
                write!(fmt, "invalid digest length: expected {}, actual {}", expected, actual)
            }
        }
    }
}

#[derive(PartialEq, Eq, Clone)]
pub struct Sha1Digest([u8; SHA_DIGEST_SIZE]);

impl Sha1Digest {
    pub fn from_bytes(digest: [u8; SHA_DIGEST_SIZE]) -> Self {
        Self(digest)
    }

    /// Decode a MIME base64 digest value. Trailing `=` padding is optional;
    /// the decoded length must be exactly `SHA_DIGEST_SIZE`.
    pub fn from_base64(encoded: &[u8]) -> Result<Self, Error> {
        let mut value = encoded;
        while let [rest @ .., last] = value {
            if *last == b'=' || last.is_ascii_whitespace() {
                value = rest;
            } else {
                break;
            }
        }

        // Slack beyond the digest size so an oversized value is reported as
        // a length mismatch rather than a decoder overflow.
        let mut buf = [0u8; SHA_DIGEST_SIZE + 3];
        let decoded = Base64NoPadding::decode(&mut buf, value, Some(BASE64_IGNORE)).map_err(Error::Decode)?;
        if decoded.len() != SHA_DIGEST_SIZE {
            return Err(Error::InvalidDigestLength {
                expected: SHA_DIGEST_SIZE,
                actual: decoded.len(),
            });
        }

        let mut digest = [0u8; SHA_DIGEST_SIZE];
        digest.copy_from_slice(decoded);
        Ok(Self(digest))
    }

    pub fn as_bytes(&self) -> &[u8; SHA_DIGEST_SIZE] {
        &self.0
    }
}

impl From<[u8; SHA_DIGEST_SIZE]> for Sha1Digest {
    fn from(digest: [u8; SHA_DIGEST_SIZE]) -> Self {
        Self::from_bytes(digest)
    }
}

impl AsRef<[u8]> for Sha1Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[rustfmt::skip]
        let hash_hex = Hex::encode_to_string(self.0.as_ref())
            .map_err(|_| fmt::Error)?;

        f.debug_tuple("Sha1Digest").field(&hash_hex).finish()
    }
}

impl fmt::Display for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[rustfmt::skip]
        let hash_hex = Hex::encode_to_string(self.0.as_ref())
            .map_err(|_| fmt::Error)?;

        f.write_str(&hash_hex)
    }
}
