use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::PipelineError;
use crate::util::sha256_bytes;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
// Writers may prepend junk before the header; readers accept it within the first KiB.
const SIGNATURE_WINDOW: usize = 1024;

enum Backing {
    Path(PathBuf),
    Temp(NamedTempFile),
}

/// An uploaded document whose container signature has been checked. The
/// bytes live on disk for as long as the value does so external readers
/// can open them by path.
pub struct Document {
    sha256: String,
    byte_len: usize,
    backing: Backing,
}

impl Document {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        validate_signature(bytes)?;

        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            sha256: sha256_bytes(bytes),
            byte_len: bytes.len(),
            backing: Backing::Temp(file),
        })
    }

    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let bytes = fs::read(path)?;
        validate_signature(&bytes)?;

        Ok(Self {
            sha256: sha256_bytes(&bytes),
            byte_len: bytes.len(),
            backing: Backing::Path(path.to_path_buf()),
        })
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn path(&self) -> &Path {
        match &self.backing {
            Backing::Path(path) => path,
            Backing::Temp(file) => file.path(),
        }
    }
}

pub fn validate_signature(bytes: &[u8]) -> Result<(), PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::invalid("document is empty"));
    }

    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    let found = window
        .windows(PDF_SIGNATURE.len())
        .any(|candidate| candidate == PDF_SIGNATURE);
    if !found {
        return Err(PipelineError::invalid("missing %PDF- signature"));
    }

    Ok(())
}
