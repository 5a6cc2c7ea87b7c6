use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use memchr::memchr_iter;
use memmap2::Mmap;

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl AsRef<[u8]> for FileContent {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileContent::Mapped(mmap) => mmap,
            FileContent::Buffered(bytes) => bytes,
        }
    }
}

impl FileContent {
    /// Split into lines on `\n`, dropping a trailing `\r`. Invalid UTF-8 is
    /// replaced rather than rejected so one bad byte never drops a file.
    pub fn lines(&self) -> Vec<String> {
        split_lines(self.as_ref())
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: the map is read-only and dropped before the walk moves on
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        let content =
            std::fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// Read `path` as a list of lines.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    Ok(read_file_smart(path)?.lines())
}

pub fn split_lines(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(bytes.len() / 40 + 1);
    let mut start = 0;
    for nl in memchr_iter(b'\n', bytes) {
        out.push(decode(&bytes[start..nl]));
        start = nl + 1;
    }
    if start < bytes.len() {
        out.push(decode(&bytes[start..]));
    }
    out
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_crlf_and_trailing_newline() {
        assert_eq!(split_lines(b"a\r\nb\nc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines(b"a\n\nb\n"), vec!["a", "", "b"]);
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = split_lines(b"ok\nbad \xff byte\n");
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[1], "bad \u{fffd} byte");
    }

    #[test]
    fn test_read_lines_from_disk() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "int main() {\n}\n").unwrap();
        assert_eq!(read_lines(tmp.path()).unwrap(), vec!["int main() {", "}"]);
    }
}
