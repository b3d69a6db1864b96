use std::{fs::File, io, path::Path};

use sha2::{Digest, Sha256};

use super::errors::{ArtefactError, ArtefactKind};

/// Checks the file at `path` against an expected lowercase-hex SHA-256 digest.
///
/// # Errors
///
/// Returns `ChecksumMismatch` when the digests differ and `Io` when the file
/// cannot be read.
pub fn verify_sha256(kind: ArtefactKind, path: &Path, expected: &str) -> Result<(), ArtefactError> {
    let actual = compute_sha256(kind, path)?;
    let expected = normalise_hex(expected);
    if actual == expected {
        Ok(())
    } else {
        Err(ArtefactError::ChecksumMismatch {
            kind,
            path: path.to_path_buf(),
            expected,
            actual,
        })
    }
}

/// Computes the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns I/O errors from opening or reading the file.
pub fn compute_sha256(kind: ArtefactKind, path: &Path) -> Result<String, ArtefactError> {
    let io_error = |source| ArtefactError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_error)?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn normalise_hex(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
