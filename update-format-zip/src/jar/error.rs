#[derive(Debug)]
pub enum Error {
    MissingEntryIndex(usize),
    MetadataTooLarge(String, u64),
    ReadEntry(String),
    DigestEntry(String),
    NoSignature(usize),
    MissingDigestManifestHeader,
    InvalidBase64(String),
    NoManifest,
    WrongManifestDigest,
    MissingDigestLine(String),
    UnexpectedContinuation(String),
    UnexpectedDigestLine(String),
    MissingFile(String),
    CorruptEntry(String),
    UnexpectedFile(String),
    WrongDigest(String),
    NoDigestForEntry(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingEntryIndex(index) => write!(f, "no entry at index {index}"),
            Error::MetadataTooLarge(name, size) => write!(f, "refusing to read {name}: {size} bytes uncompressed"),
            Error::ReadEntry(name) => write!(f, "can't read {name}"),
            Error::DigestEntry(name) => write!(f, "can't digest {name}"),
            Error::NoSignature(num_entries) => write!(f, "no signature ({num_entries} files)"),
            Error::MissingDigestManifestHeader => write!(f, "no digest manifest in signature file"),
            Error::InvalidBase64(name) => write!(f, "invalid base64 digest for {name}"),
            Error::NoManifest => write!(f, "no manifest file META-INF/MANIFEST.MF"),
            Error::WrongManifestDigest => write!(f, "wrong digest for META-INF/MANIFEST.MF"),
            Error::MissingDigestLine(name) => write!(f, "no digest line for {name}"),
            Error::UnexpectedContinuation(tail) => write!(f, "unexpected name continuation: {tail}"),
            Error::UnexpectedDigestLine(value) => write!(f, "unexpected digest line: {value}"),
            Error::MissingFile(name) => write!(f, "manifest names a missing file: {name}"),
            Error::CorruptEntry(name) => write!(f, "corrupt file: {name}"),
            Error::UnexpectedFile(name) => write!(f, "unexpected file in manifest: {name}"),
            Error::WrongDigest(name) => write!(f, "wrong digest for {name}"),
            Error::NoDigestForEntry(name) => write!(f, "no digest for {name}"),
        }
    }
}
