use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use update_format_zip::archive::ZipArchiveReader;
use update_format_zip::jar;
use update_format_zip::progress::Progress;
use update_format_zip::verify_sig::TrustedKey;
use update_format_zip::whole_file::{self, VerifyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    Unverified,
    BadSignature,
    Verified,
}

/// One on-disk update payload and the verification state it has reached.
#[derive(Debug)]
pub struct Package {
    path: PathBuf,
    status: PackageStatus,
}

impl Package {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: PackageStatus::Unverified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> PackageStatus {
        self.status
    }

    /// Whole-file mode: check the RSA signature carried in the archive
    /// comment against the trusted keys.
    pub fn verify_whole_file(&mut self, keys: &[TrustedKey], progress: &mut dyn Progress) -> VerifyResult {
        let result = whole_file::verify_file(&self.path, keys, progress);

        self.status = match result {
            VerifyResult::Success => PackageStatus::Verified,
            VerifyResult::Failure => PackageStatus::BadSignature,
        };
        if self.status == PackageStatus::Verified {
            info!("package {} verified", self.path.display());
        }

        result
    }

    /// JAR mode: verify the signed-manifest chain covering every entry.
    pub fn verify_jar(&mut self, keys: &[TrustedKey], progress: &mut dyn Progress) -> Result<bool> {
        let file = File::open(&self.path).context(format!("failed to open path ({:?})", self.path.display()))?;
        let mut archive = ZipArchiveReader::new(file).context(format!("failed to open archive ({:?})", self.path.display()))?;

        let verified = jar::verify_jar_signature(&mut archive, keys, progress);

        self.status = if verified {
            info!("package {} verified", self.path.display());
            PackageStatus::Verified
        } else {
            PackageStatus::BadSignature
        };

        Ok(verified)
    }
}
