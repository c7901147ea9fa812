// Input file list parsing
// One path per line; blank lines and lines starting with '#' are ignored

use std::fs;
use std::io;
use std::path::Path;

/// Extract the paths listed in `content`.
pub fn parse_file_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read and parse the file list at `path`.
pub fn read_file_list(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_file_list(&content))
}
