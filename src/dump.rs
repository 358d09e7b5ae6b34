use crate::credential::{Credentials, Password, User, ValidationError};

/// Candidate field separators, in detection priority order.
pub const SUPPORTED_SEPARATORS: [char; 3] = [':', ',', ';'];

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("leak dump is empty")]
    EmptyDump,
    #[error("first line does not contain a supported separator ({supported})")]
    UndetectedSeparator { supported: String },
    #[error("line {line}: expected identifier and secret separated by {separator:?}")]
    MissingSeparator { line: usize, separator: char },
    #[error("line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: ValidationError,
    },
    #[error("failed to read dump: {0:#}")]
    Read(anyhow::Error),
}

impl ParseError {
    /// 1-based line number for errors tied to a single dump line.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            ParseError::MissingSeparator { line, .. } | ParseError::Invalid { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }

    /// File-level errors stop the parse before any line is converted.
    pub fn is_fatal(&self) -> bool {
        self.line_number().is_none()
    }
}

/// Pick the separator for a whole dump by looking at its first line only.
pub fn detect_separator(first_line: &str) -> Result<char, ParseError> {
    SUPPORTED_SEPARATORS
        .iter()
        .copied()
        .find(|sep| first_line.contains(*sep))
        .ok_or_else(|| ParseError::UndetectedSeparator {
            supported: SUPPORTED_SEPARATORS
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        })
}

/// Convert one dump line into its user and credentials. Only the first
/// separator splits; the rest of the line is the secret, verbatim.
pub fn parse_dump_line(
    line: &str,
    separator: char,
    line_number: usize,
) -> Result<(User, Credentials), ParseError> {
    let (identifier, secret) = line
        .split_once(separator)
        .ok_or(ParseError::MissingSeparator {
            line: line_number,
            separator,
        })?;
    let invalid = |source| ParseError::Invalid {
        line: line_number,
        source,
    };
    let user = User::new(identifier).map_err(invalid)?;
    let password = Password::new(secret).map_err(invalid)?;
    Ok((user, Credentials::new(password)))
}
