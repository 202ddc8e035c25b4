
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::{RagError, Result};

/// Raw text read from a single file, or from a single page of a paginated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: PathBuf,
    /// Page number, starting at 1, for paginated formats
    pub page: Option<usize>,
}

/// File formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Documents loaded from a set of files, along with what was skipped
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub loaded_files: Vec<PathBuf>,
    pub skipped_files: Vec<PathBuf>,
}

/// Load every supported file into documents.
///
/// Files with an unsupported extension are skipped with a warning. A supported
/// file that is empty or cannot be read aborts the whole load.
#[inline]
pub fn load_documents(paths: &[PathBuf]) -> Result<LoadedDocuments> {
    info!("Starting document loading for {} files", paths.len());
    let mut loaded = LoadedDocuments::default();

    for path in paths {
        let Some(kind) = FileKind::from_path(path) else {
            warn!("Unsupported file type, skipping: {}", path.display());
            loaded.skipped_files.push(path.clone());
            continue;
        };

        debug!("Processing file: {}", path.display());
        let documents = load_file(path, kind).inspect_err(|e| {
            error!("Error processing {}: {}", path.display(), e);
        })?;

        info!(
            "Successfully loaded {} ({} documents)",
            path.display(),
            documents.len()
        );
        loaded.documents.extend(documents);
        loaded.loaded_files.push(path.clone());
    }

    info!("Total documents loaded: {}", loaded.documents.len());
    Ok(loaded)
}

/// Load one file of a known kind
#[inline]
pub fn load_file(path: &Path, kind: FileKind) -> Result<Vec<Document>> {
    let bytes = fs::read(path).map_err(|e| empty_input(path, format!("failed to read file: {e}")))?;
    if bytes.is_empty() {
        return Err(empty_input(path, "file is empty"));
    }

    match kind {
        FileKind::Text => load_text(path, bytes),
        FileKind::Pdf => load_pdf(path, &bytes),
    }
}

fn load_text(path: &Path, bytes: Vec<u8>) -> Result<Vec<Document>> {
    let text = String::from_utf8(bytes).map_err(|_| empty_input(path, "file is not valid UTF-8"))?;
    if text.trim().is_empty() {
        return Err(empty_input(path, "file contains only whitespace"));
    }

    Ok(vec![Document {
        text,
        source: path.to_path_buf(),
        page: None,
    }])
}

fn load_pdf(path: &Path, bytes: &[u8]) -> Result<Vec<Document>> {
    // pdf-extract panics on some malformed files instead of returning an error
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| empty_input(path, "PDF could not be parsed"))?
        .map_err(|e| empty_input(path, format!("PDF could not be parsed: {e}")))?;

    let documents = pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| Document {
            text,
            source: path.to_path_buf(),
            page: Some(index + 1),
        })
        .collect::<Vec<_>>();

    if documents.is_empty() {
        return Err(empty_input(path, "PDF contains no extractable text"));
    }

    Ok(documents)
}

fn empty_input(path: &Path, reason: impl Into<String>) -> RagError {
    RagError::EmptyInput {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Expand directories into the files below them.
///
/// Directory contents are walked recursively and sorted so repeated ingestion
/// of the same directory produces chunks in the same order.
#[inline]
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            walk_directory(path, &mut found)?;
            found.sort();
            debug!("Found {} files in {}", found.len(), path.display());
            files.extend(found);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(RagError::Validation(format!(
                "Error: {} does not exist.",
                path.display()
            )));
        }
    }

    Ok(files)
}

fn walk_directory(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_directory(&path, found)?;
        } else if file_type.is_symlink() && path.is_dir() {
            // Symlinked directories can form cycles
            warn!("Skipping symlinked directory: {}", path.display());
        } else {
            found.push(path);
        }
    }
    Ok(())
}

/// Check a file selection before ingestion starts.
///
/// With `strict`, files that the loader would skip are rejected instead.
#[inline]
pub fn validate_selection(paths: &[PathBuf], strict: bool) -> Result<()> {
    if paths.is_empty() {
        return Err(RagError::Validation(
            "Please provide at least one file.".to_string(),
        ));
    }

    for path in paths {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let metadata = fs::metadata(path).map_err(|_| {
            RagError::Validation(format!("Error: {} does not exist.", path.display()))
        })?;

        if metadata.is_file() && metadata.len() == 0 {
            return Err(RagError::Validation(format!(
                "Error: {name} is empty. Please provide a valid file."
            )));
        }

        if strict && FileKind::from_path(path).is_none() {
            return Err(RagError::Validation(format!(
                "Error: {name} is not a supported file type. Please provide PDF or TXT files only."
            )));
        }
    }

    Ok(())
}
