//! Folder and file hierarchy for organisations.
//!
//! This module provides:
//! - Path resolution from the database parent chain ([`path`])
//! - The on-disk mirror of the hierarchy ([`FileStorage`])
//! - Folder and file metadata repositories
//! - [`HierarchyService`], which keeps database rows and disk in step

mod folder;
mod metadata;
pub mod path;
mod service;
mod storage;

pub use folder::{Folder, FolderRepository, FolderSummary, NewFolder, ParentRef};
pub use metadata::{file_type_of, FileRecord, FileRepository, NewFile};
pub use service::{AuditReport, FolderListing, HierarchyService, StoredFile, Upload};
pub use storage::FileStorage;

use crate::{FmsError, Result};

/// Name reserved for the organisation root in client requests.
pub const ROOT_FOLDER_NAME: &str = "root";

/// Maximum folder name length (in characters).
pub const MAX_FOLDER_NAME_LENGTH: usize = 64;

/// Maximum file name length (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// File types accepted for upload.
pub const ALLOWED_FILE_TYPES: &[&str] = &[".pdf", ".doc", ".docx", ".jpg", ".jpeg", ".png"];

/// Characters rejected in uploaded file names.
pub const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Validate and trim a folder name.
pub fn validate_folder_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FmsError::Validation("folder name cannot be empty".into()));
    }
    if name.chars().count() > MAX_FOLDER_NAME_LENGTH {
        return Err(FmsError::Validation(format!(
            "folder name must be at most {MAX_FOLDER_NAME_LENGTH} characters"
        )));
    }
    if name.eq_ignore_ascii_case(ROOT_FOLDER_NAME) {
        return Err(FmsError::Validation(format!(
            "'{ROOT_FOLDER_NAME}' is a reserved folder name"
        )));
    }
    if name
        .chars()
        .any(|c| c.is_control() || INVALID_FILENAME_CHARS.contains(&c))
        || name == "."
        || name == ".."
    {
        return Err(FmsError::Validation(
            "folder name contains invalid characters".into(),
        ));
    }
    Ok(name)
}

/// Validate and trim a file name.
pub fn validate_file_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FmsError::Validation("file name cannot be empty".into()));
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(FmsError::Validation(format!(
            "file name must be at most {MAX_FILENAME_LENGTH} characters"
        )));
    }
    if name
        .chars()
        .any(|c| c.is_control() || INVALID_FILENAME_CHARS.contains(&c))
        || name == "."
        || name == ".."
    {
        return Err(FmsError::Validation(
            "file name contains invalid characters".into(),
        ));
    }
    Ok(name)
}

/// Check an incoming upload's type and size before it reaches the store.
pub fn validate_upload(name: &str, size: u64, max_size: u64) -> Result<()> {
    validate_file_name(name)?;

    let file_type = file_type_of(name);
    if !ALLOWED_FILE_TYPES.contains(&file_type.as_str()) {
        return Err(FmsError::Validation(format!(
            "file type '{file_type}' is not allowed"
        )));
    }
    if size > max_size {
        return Err(FmsError::Validation(format!(
            "file exceeds the maximum size of {} MB",
            max_size / (1024 * 1024)
        )));
    }
    Ok(())
}
