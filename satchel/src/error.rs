use satchel_base::{Scenario, ValueError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
const ENOTDIR: i32 = 20;
#[cfg(unix)]
const EISDIR: i32 = 21;

/// Failure of a File or Folder operation. Raw OS errors are translated into one of these at
/// the point of the failing call, callers branch on the variant.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("cannot {what} \"{}\" ({note})", .path.display())]
    NotFound {
        what: &'static str,
        path: PathBuf,
        note: String,
    },

    #[error("cannot {what} \"{}\" ({note})", .path.display())]
    NoAccess {
        what: &'static str,
        path: PathBuf,
        note: String,
    },

    #[error("cannot {what} \"{}\" ({note})", .path.display())]
    NotAFile {
        what: &'static str,
        path: PathBuf,
        note: String,
    },

    #[error("cannot {what} \"{}\" ({note})", .path.display())]
    AlreadyExists {
        what: &'static str,
        path: PathBuf,
        note: String,
    },

    #[error("cannot {what} \"{}\" ({note}{})", .path.display(), .code.map(|c| format!(", code {c}")).unwrap_or_default())]
    Failure {
        what: &'static str,
        path: PathBuf,
        note: String,
        code: Option<i32>,
    },

    #[error("cannot encode for \"{}\": {source}", .path.display())]
    Encoding { path: PathBuf, source: CodecError },

    #[error("cannot decode from \"{}\": {source}", .path.display())]
    Decoding { path: PathBuf, source: CodecError },
}

impl FileError {
    /// Translate an OS-level failure of `what` on `path`.
    pub fn from_io(e: io::Error, what: &'static str, path: &Path) -> Self {
        let path = path.to_path_buf();
        match e.kind() {
            io::ErrorKind::NotFound => {
                return FileError::NotFound {
                    what,
                    path,
                    note: "name does not exist".into(),
                }
            }
            io::ErrorKind::PermissionDenied => {
                return FileError::NoAccess {
                    what,
                    path,
                    note: "access or permissions".into(),
                }
            }
            io::ErrorKind::AlreadyExists => {
                return FileError::AlreadyExists {
                    what,
                    path,
                    note: "name already exists".into(),
                }
            }
            _ => {}
        }
        if let Some(note) = not_a_file(&e) {
            return FileError::NotAFile {
                what,
                path,
                note: note.into(),
            };
        }
        FileError::Failure {
            what,
            path,
            note: e.to_string(),
            code: e.raw_os_error(),
        }
    }

    pub fn failure(what: &'static str, path: impl Into<PathBuf>, note: impl Into<String>) -> Self {
        FileError::Failure {
            what,
            path: path.into(),
            note: note.into(),
            code: None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileError::NotFound { path, .. }
            | FileError::NoAccess { path, .. }
            | FileError::NotAFile { path, .. }
            | FileError::AlreadyExists { path, .. }
            | FileError::Failure { path, .. }
            | FileError::Encoding { path, .. }
            | FileError::Decoding { path, .. } => path,
        }
    }
}

#[cfg(unix)]
fn not_a_file(e: &io::Error) -> Option<&'static str> {
    match e.raw_os_error() {
        Some(ENOTDIR) => Some("name in path is not a folder"),
        Some(EISDIR) => Some("name refers to a folder"),
        _ => None,
    }
}

#[cfg(not(unix))]
fn not_a_file(_e: &io::Error) -> Option<&'static str> {
    None
}

#[derive(Error, Debug)]
pub enum CodecError {
    /// The request itself cannot be honoured, e.g. an unknown version tag.
    #[error("{}", .0)]
    Usage(String),

    /// Text or value does not have the expected shape.
    #[error("{}", .0)]
    Failed(String),

    #[error("version \"{version}\" of \"{record}\" is {scenario}")]
    Version {
        record: String,
        version: String,
        scenario: Scenario,
    },

    #[error(transparent)]
    Value(#[from] ValueError),
}
