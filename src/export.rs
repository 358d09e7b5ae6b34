//! CSV export of the dump lines the parser rejected.
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::dump::ParseError;

/// Writes one `line,error` row per error. File-level errors have an empty
/// line column. Rows are sorted by line number.
pub fn save_rejected_lines_csv<P: AsRef<Path>>(errors: &[ParseError], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut sorted: Vec<&ParseError> = errors.iter().collect();
    sorted.sort_by_key(|e| e.line_number());

    let mut wtr =
        Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(["line", "error"])?;
    for err in sorted {
        let line = err.line_number().map(|n| n.to_string()).unwrap_or_default();
        wtr.write_record([line, err.to_string()])?;
    }
    wtr.flush()
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DumpParser;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_sorted_rows() {
        let lines = ["a@x.com:1", "broken", "b@x.com:2", "c@x.com:", "nope"];
        let outcome = DumpParser::new().with_chunk_size(1).parse(&lines);
        let dir = tempdir().unwrap();
        let path = dir.path().join("rejected.csv");
        save_rejected_lines_csv(&outcome.errors, &path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            rdr.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["line", "error"]
        );
        let lines: Vec<String> = rdr
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(lines, vec!["2", "4", "5"]);
    }

    #[test]
    fn error_messages_are_quoted_when_needed() {
        let errors = vec![ParseError::MissingSeparator {
            line: 3,
            separator: ',',
        }];
        let dir = tempdir().unwrap();
        let path = dir.path().join("rejected.csv");
        save_rejected_lines_csv(&errors, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("line,error\n3,\"line 3:"));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("rejected.csv");
        assert!(save_rejected_lines_csv(&[], &path).is_err());
    }
}
