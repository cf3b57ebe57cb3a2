use std::path::{Path, PathBuf};

pub const EXTENSION: &str = "hc";
const EXTRACTED_PREFIX: &str = "extracted.";

/// `dir/name.txt` compressed with chunks of 4 bytes becomes `dir/name.txt.4.hc`.
pub fn compressed_path(input: &Path, chunk_size: usize) -> Option<PathBuf> {
    let file_name = input.file_name()?.to_str()?;
    Some(input.with_file_name(format!("{file_name}.{chunk_size}.{EXTENSION}")))
}

/// `dir/name.txt.4.hc` becomes `dir/extracted.name.txt.4`; anything not
/// ending in `.hc` is refused.
pub fn extracted_path(input: &Path) -> Option<PathBuf> {
    let file_name = input.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(&format!(".{EXTENSION}"))?;
    if stem.is_empty() {
        return None;
    }
    Some(input.with_file_name(format!("{EXTRACTED_PREFIX}{stem}")))
}
