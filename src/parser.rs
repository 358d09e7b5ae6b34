//! Parser engine: turns a line-oriented leak dump into the user → credentials
//! map of an [`Import`](crate::leak::Import), fanning the lines out over a
//! `rayon` pool in contiguous chunks.
//!
//! Typical usage:
//!
//! ```no_run
//! use leakdb::parser::DumpParser;
//! let outcome = DumpParser::new().parse_file("/path/to/dump.txt");
//! for err in &outcome.errors {
//!     eprintln!("{err}");
//! }
//! println!("{} users parsed", outcome.affected_users.len());
//! ```
//!
//! Separator detection looks at the first line only. Per-line problems are
//! collected and never abort the parse; an empty dump or a first line without
//! a supported separator stops it before any line is converted.
//!
//! Chunk results are merged in chunk order, so when an identifier appears in
//! more than one line the occurrence closest to the end of the file wins,
//! whether or not the duplicates landed in the same worker.
use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use rayon::prelude::*;

use crate::credential::{Credentials, User};
use crate::dump::{ParseError, detect_separator, parse_dump_line};
use crate::io::{DEFAULT_MMAP_THRESHOLD_BYTES, read_lines_auto};

/// Upper bound on the number of lines handed to one worker.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

pub type LeakParse = HashMap<User, Credentials>;

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub affected_users: LeakParse,
    pub errors: Vec<ParseError>,
}

impl ParseOutcome {
    fn failed(err: ParseError) -> Self {
        Self {
            affected_users: HashMap::new(),
            errors: vec![err],
        }
    }

    /// True when the dump could not be parsed at all.
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(ParseError::is_fatal)
    }
}

#[derive(Debug, Clone)]
pub struct DumpParser {
    chunk_size: usize,
    mmap_threshold_bytes: u64,
}

impl Default for DumpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpParser {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }

    /// Lines per worker; values below one are clamped to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_mmap_threshold(mut self, threshold_bytes: u64) -> Self {
        self.mmap_threshold_bytes = threshold_bytes;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn parse<S: AsRef<str> + Sync>(&self, lines: &[S]) -> ParseOutcome {
        self.parse_with(lines, |_| {})
    }

    /// Parse `lines`, calling `on_error` for every error as soon as it is
    /// found. The callback runs on worker threads.
    pub fn parse_with<S, F>(&self, lines: &[S], on_error: F) -> ParseOutcome
    where
        S: AsRef<str> + Sync,
        F: Fn(&ParseError) + Sync,
    {
        let Some(first) = lines.first() else {
            let err = ParseError::EmptyDump;
            on_error(&err);
            return ParseOutcome::failed(err);
        };
        let separator = match detect_separator(first.as_ref()) {
            Ok(sep) => sep,
            Err(err) => {
                on_error(&err);
                return ParseOutcome::failed(err);
            }
        };

        let chunk_size = self.chunk_size;
        let workers = lines.len().div_ceil(chunk_size);
        debug!(
            "parsing {} lines with separator {:?} across {} chunk(s)",
            lines.len(),
            separator,
            workers
        );

        let partials: Vec<ParseOutcome> = lines
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(idx, chunk)| parse_chunk(chunk, separator, idx * chunk_size, &on_error))
            .collect();

        let mut outcome = ParseOutcome::default();
        for partial in partials {
            outcome.affected_users.extend(partial.affected_users);
            outcome.errors.extend(partial.errors);
        }
        info!(
            "parsed {} lines: {} users, {} rejected",
            lines.len(),
            outcome.affected_users.len(),
            outcome.errors.len()
        );
        outcome
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> ParseOutcome {
        self.parse_file_with(path, |_| {})
    }

    pub fn parse_file_with<P, F>(&self, path: P, on_error: F) -> ParseOutcome
    where
        P: AsRef<Path>,
        F: Fn(&ParseError) + Sync,
    {
        match read_lines_auto(&path, self.mmap_threshold_bytes) {
            Ok(lines) => self.parse_with(&lines, on_error),
            Err(e) => {
                let err = ParseError::Read(e);
                on_error(&err);
                ParseOutcome::failed(err)
            }
        }
    }
}

fn parse_chunk<S, F>(chunk: &[S], separator: char, offset: usize, on_error: &F) -> ParseOutcome
where
    S: AsRef<str>,
    F: Fn(&ParseError),
{
    let mut local = ParseOutcome::default();
    for (i, line) in chunk.iter().enumerate() {
        match parse_dump_line(line.as_ref(), separator, offset + i + 1) {
            Ok((user, credentials)) => {
                local.affected_users.insert(user, credentials);
            }
            Err(err) => {
                on_error(&err);
                local.errors.push(err);
            }
        }
    }
    local
}
