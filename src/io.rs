use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Dumps at least this large are memory-mapped instead of read through a
/// buffered reader.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Read every line of `path` with a buffered reader.
pub fn read_lines_bufread<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        if n == 0 {
            break;
        }
        let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        lines.push(line_from_bytes(bytes));
    }
    Ok(lines)
}

/// Read every line of `path` through a read-only memory map, splitting on
/// `\n` with `memchr`.
pub fn read_lines_mmap<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.as_ref().display()))?;
    let data: &[u8] = &mmap;
    let mut lines = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        match memchr::memchr(b'\n', &data[pos..]) {
            Some(off) => {
                lines.push(line_from_bytes(&data[pos..pos + off]));
                pos += off + 1;
            }
            None => {
                // Last line without trailing newline
                lines.push(line_from_bytes(&data[pos..]));
                pos = data.len();
            }
        }
    }
    Ok(lines)
}

fn line_from_bytes(bytes: &[u8]) -> String {
    let slice = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(slice).into_owned()
}

/// Choose mmap or buffered reading by file size.
pub fn read_lines_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<Vec<String>> {
    let meta =
        std::fs::metadata(&path).with_context(|| format!("stat {}", path.as_ref().display()))?;
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        read_lines_mmap(path)
    } else {
        read_lines_bufread(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dump(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn both_readers_agree_on_crlf_and_missing_trailing_newline() {
        let f = dump(b"a@b.com:one\r\nc@d.com:two\n\ne@f.com:three");
        let expected = vec!["a@b.com:one", "c@d.com:two", "", "e@f.com:three"];
        assert_eq!(read_lines_bufread(f.path()).unwrap(), expected);
        assert_eq!(read_lines_mmap(f.path()).unwrap(), expected);
        assert_eq!(read_lines_auto(f.path(), 1).unwrap(), expected);
        assert_eq!(read_lines_auto(f.path(), u64::MAX).unwrap(), expected);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let f = dump(b"x@y.com:caf\xe9\n");
        let lines = read_lines_auto(f.path(), 1).unwrap();
        assert_eq!(lines, vec!["x@y.com:caf\u{FFFD}"]);
    }

    #[test]
    fn empty_file_has_no_lines() {
        let f = dump(b"");
        assert!(read_lines_auto(f.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_lines_auto(dir.path().join("nope.txt"), 0).is_err());
    }
}
