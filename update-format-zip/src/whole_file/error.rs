#[derive(Debug)]
pub enum Error {
    OpenFile(std::io::Error),
    GetFileMetadata(std::io::Error),
    FileTooShort(u64),
    ReadFooter(std::io::Error),
    MissingFooterSentinel(u8, u8),
    SignatureTooShort(u16),
    CommentTooShort(u16),
    EocdLongerThanFile {
        eocd_size: u64,
        file_len: u64,
    },
    ReadEocd(std::io::Error),
    MissingEocdMagic,
    EocdMagicRepeated(usize),
    ReadSignedData(std::io::Error),
    SignatureRejected(usize),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::OpenFile(err) => write!(f, "failed to open file: {err}"),
            Error::GetFileMetadata(err) => write!(f, "failed to get file metadata: {err}"),
            Error::FileTooShort(len) => write!(f, "file too short to carry a signature footer: {len} bytes"),
            Error::ReadFooter(err) => write!(f, "failed to read signature footer: {err}"),
            Error::MissingFooterSentinel(b2, b3) => write!(f, "footer sentinel mismatch: {b2:#04x} {b3:#04x}"),
            Error::SignatureTooShort(start) => write!(f, "signature block too short to hold an RSA signature: {start} bytes from end"),
            Error::CommentTooShort(len) => write!(f, "comment too short to hold the signature block: {len} bytes"),
            Error::EocdLongerThanFile {
                eocd_size,
                file_len,
            } => write!(f, "end-of-central-directory record longer than file: {eocd_size} > {file_len}"),
            Error::ReadEocd(err) => write!(f, "failed to read end-of-central-directory record: {err}"),
            Error::MissingEocdMagic => write!(f, "signature length doesn't match EOCD marker"),
            Error::EocdMagicRepeated(offset) => write!(f, "EOCD marker occurs again at offset {offset} after start of EOCD"),
            Error::ReadSignedData(err) => write!(f, "failed to read signed data: {err}"),
            Error::SignatureRejected(num_keys) => write!(f, "no trusted key verifies the whole-file signature ({num_keys} keys tried)"),
        }
    }
}
