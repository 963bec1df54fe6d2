use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{NightError, ValidationError};

pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";
// Readers tolerate leading garbage before the header within the first KiB.
const HEADER_WINDOW: usize = 1024;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Checks type (by extension) and size, without touching file contents.
pub fn check_metadata(path: &Path, size: u64, limit: u64) -> Result<(), ValidationError> {
    let name = display_name(path);
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(ValidationError::NotPdf { name });
    }
    if size > limit {
        return Err(ValidationError::TooLarge { name, size, limit });
    }
    Ok(())
}

pub fn check_header(name: &str, bytes: &[u8]) -> Result<(), ValidationError> {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    if window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
    {
        Ok(())
    } else {
        Err(ValidationError::NotPdf {
            name: name.to_owned(),
        })
    }
}

/// Validates and reads an input file. Oversized files are rejected before being read.
pub fn read_input(path: &Path, limit: u64) -> Result<Vec<u8>, NightError> {
    let metadata = fs::metadata(path)
        .map_err(|err| NightError::Decode(format!("cannot read {}: {err}", path.display())))?;
    check_metadata(path, metadata.len(), limit)?;
    let bytes = fs::read(path)
        .map_err(|err| NightError::Decode(format!("cannot read {}: {err}", path.display())))?;
    check_header(&display_name(path), &bytes)?;
    debug!(path = %path.display(), size = bytes.len(), "input accepted");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use tempfile::tempdir;

    #[test]
    fn rejects_non_pdf_extension() {
        let err = check_metadata(&PathBuf::from("notes.txt"), 10, MAX_FILE_SIZE).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotPdf {
                name: "notes.txt".into()
            }
        );
    }

    #[test]
    fn size_limit_is_inclusive() {
        let path = PathBuf::from("Report.PDF");
        assert!(check_metadata(&path, MAX_FILE_SIZE, MAX_FILE_SIZE).is_ok());
        assert!(matches!(
            check_metadata(&path, MAX_FILE_SIZE + 1, MAX_FILE_SIZE),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn header_may_follow_leading_bytes() {
        assert!(check_header("a.pdf", b"%PDF-1.7\n").is_ok());
        assert!(check_header("a.pdf", b"\xef\xbb\xbf%PDF-1.4").is_ok());
        assert!(check_header("a.pdf", b"PK\x03\x04").is_err());
    }

    #[test]
    fn read_input_rejects_disguised_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"just text").unwrap();

        let err = read_input(&path, MAX_FILE_SIZE).unwrap_err();
        assert!(matches!(err, NightError::Validation(ValidationError::NotPdf { .. })));
    }

    #[test]
    fn read_input_enforces_limit_before_reading() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, b"%PDF-1.4 0123456789").unwrap();

        let err = read_input(&path, 8).unwrap_err();
        assert!(matches!(
            err,
            NightError::Validation(ValidationError::TooLarge { limit: 8, .. })
        ));
        assert!(read_input(&path, MAX_FILE_SIZE).is_ok());
    }
}
