//! Local files picked for upload, described as attachments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;

use crate::models::Attachment;

/// Largest file accepted for upload: 10 MiB.
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// MIME type given to files with an unrecognized extension.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Why a file was left out of an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{} is {size} bytes, over the {MAX_UPLOAD_SIZE} byte limit", path.display())]
    TooLarge { path: PathBuf, size: u64 },

    #[error("{} is not a regular file", path.display())]
    NotAFile { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files accepted for upload, with the ones that were skipped.
#[derive(Debug, Default)]
pub struct Upload {
    pub accepted: Vec<Attachment>,
    pub skipped: Vec<UploadError>,
}

/// MIME type for `path`, judged by its extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use inkdrop::upload::mime_type_for;
///
/// assert_eq!(mime_type_for(Path::new("photo.JPG")), "image/jpeg");
/// assert_eq!(mime_type_for(Path::new("README")), "application/octet-stream");
/// ```
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "md" => "text/markdown",
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Describes one file as an attachment with the given id.
///
/// # Errors
///
/// Fails if the file cannot be read, is not a regular file, or is larger
/// than [`MAX_UPLOAD_SIZE`].
pub fn describe(path: &Path, id: i64, uploaded_at: OffsetDateTime) -> Result<Attachment, UploadError> {
    let io = |source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(io)?;
    if !metadata.is_file() {
        return Err(UploadError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    if metadata.len() > MAX_UPLOAD_SIZE {
        return Err(UploadError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
        });
    }

    let absolute = fs::canonicalize(path).map_err(io)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| absolute.display().to_string());

    Ok(Attachment {
        id,
        name,
        mime_type: mime_type_for(path).to_string(),
        size: metadata.len(),
        url: format!("file://{}", absolute.display()),
        uploaded_at,
    })
}

/// Describes every file in `paths`, numbering accepted files from
/// `first_id`. Files that cannot be described are skipped.
pub fn prepare<P: AsRef<Path>>(paths: &[P], first_id: i64, uploaded_at: OffsetDateTime) -> Upload {
    let mut upload = Upload::default();
    let mut next_id = first_id;
    for path in paths {
        match describe(path.as_ref(), next_id, uploaded_at) {
            Ok(attachment) => {
                upload.accepted.push(attachment);
                next_id += 1;
            }
            Err(error) => upload.skipped.push(error),
        }
    }
    upload
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;
    use time::macros::datetime;

    const AT: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    fn write(dir: &Path, name: &str, len: u64) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap().set_len(len).unwrap();
        path
    }

    #[test]
    fn mime_types_follow_the_extension() {
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("dir/b.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("c.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("d.tar.gz")), FALLBACK_MIME_TYPE);
        assert_eq!(mime_type_for(Path::new("noext")), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn describe_fills_in_the_descriptor() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "cat.png", 1234);

        let attachment = describe(&path, 4, AT).unwrap();

        assert_eq!(attachment.id, 4);
        assert_eq!(attachment.name, "cat.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.size, 1234);
        assert!(attachment.url.starts_with("file://"));
        assert!(attachment.url.ends_with("cat.png"));
        assert_eq!(attachment.uploaded_at, AT);
        assert!(attachment.is_image());
    }

    #[test]
    fn file_at_the_limit_is_accepted_and_one_byte_over_is_not() {
        let dir = tempdir().unwrap();
        let at_limit = write(dir.path(), "big.pdf", MAX_UPLOAD_SIZE);
        let over = write(dir.path(), "huge.pdf", MAX_UPLOAD_SIZE + 1);

        assert!(describe(&at_limit, 1, AT).is_ok());
        assert!(matches!(
            describe(&over, 1, AT),
            Err(UploadError::TooLarge { size, .. }) if size == MAX_UPLOAD_SIZE + 1
        ));
    }

    #[test]
    fn directories_and_missing_files_are_rejected() {
        let dir = tempdir().unwrap();

        assert!(matches!(
            describe(dir.path(), 1, AT),
            Err(UploadError::NotAFile { .. })
        ));
        assert!(matches!(
            describe(&dir.path().join("gone.txt"), 1, AT),
            Err(UploadError::Io { .. })
        ));
    }

    #[test]
    fn prepare_numbers_accepted_files_and_collects_skipped_ones() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write(dir.path(), "a.png", 10),
            write(dir.path(), "huge.png", MAX_UPLOAD_SIZE + 1),
            write(dir.path(), "b.txt", 10),
        ];

        let upload = prepare(&paths, 7, AT);

        let ids: Vec<_> = upload.accepted.iter().map(|a| (a.id, a.name.as_str())).collect();
        assert_eq!(ids, vec![(7, "a.png"), (8, "b.txt")]);
        assert_eq!(upload.skipped.len(), 1);
        assert!(upload.skipped[0].to_string().contains("huge.png"));
    }
}
