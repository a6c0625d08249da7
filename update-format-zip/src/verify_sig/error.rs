#[derive(Debug)]
pub enum Error {
    WrongModulusSize {
        expected: usize,
        actual: usize,
    },
    WrongSignatureSize {
        expected: usize,
        actual: usize,
    },
    InvalidPkcs1v15Signature(rsa::signature::Error),
    CouldNotVerifySignature(rsa::signature::Error),
    ReadPublicKey(std::io::Error),
    DeserialisePkcs1(rsa::pkcs1::Error),
    DecodePublicKey(rsa::pkcs8::spki::Error),
    InvalidPublicKeyType,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::WrongModulusSize {
                expected,
                actual,
            } => write!(f, "wrong modulus size: expected {expected} bytes, got {actual}"),
            Error::WrongSignatureSize {
                expected,
                actual,
            } => write!(f, "wrong signature size: expected {expected} bytes, got {actual}"),
            Error::InvalidPkcs1v15Signature(err) => write!(f, "invalid pkcs1v15 signature: {err}"),
            Error::CouldNotVerifySignature(err) => write!(f, "failed to verify signature: {err}"),
            Error::ReadPublicKey(err) => write!(f, "failed to read public key: {err}"),
            Error::DeserialisePkcs1(err) => write!(f, "failed to deserialise PKCS1 PEM: {err}"),
            Error::DecodePublicKey(err) => write!(f, "failed to decode public key: {err}"),
            Error::InvalidPublicKeyType => write!(f, "invalid public key type"),
        }
    }
}
