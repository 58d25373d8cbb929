use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The supplied path does not point at a readable file. Rejected before
    /// any parser state is touched.
    #[error("not a valid log file: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A read failure on the log stream. Fatal for the run; the caller must
    /// start a fresh run, there is no resume.
    #[error("log read failure: {0}")]
    Io(#[from] std::io::Error),
}
