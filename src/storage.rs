use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Extensions request files are expected to carry.
pub const REQUEST_FILE_EXTENSIONS: [&str; 2] = ["http", "rest"];

/// The lines of a request file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl RequestFile {
    /// Loads a request file from disk.
    ///
    /// Files without an `.http` or `.rest` extension are loaded, with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if the file does not exist, and
    /// [`LoadError::Io`] if it cannot be read.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !has_request_extension(path) {
            tracing::warn!(
                "'{}' does not have a .http or .rest extension",
                path.display()
            );
        }

        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: io_error,
            },
        })?;

        let mut reader = BufReader::new(file);
        let lines = Self::read(&mut reader).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Read {} lines from '{}'", lines.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            lines,
        })
    }

    /// Reads lines, dropping the carriage return of `\r\n` line endings.
    pub(crate) fn read<R: BufRead>(reader: &mut R) -> io::Result<Vec<String>> {
        reader
            .lines()
            .map(|line| {
                line.map(|mut line| {
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    line
                })
            })
            .collect()
    }

    /// The path the file was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lines of the file, without line breaks.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn has_request_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            REQUEST_FILE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(extension))
        })
}

/// Errors that can occur when loading a request file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The request file was not found.
    #[error("request file '{}' not found", .0.display())]
    NotFound(PathBuf),

    /// The request file could not be read.
    #[error("failed to read request file '{}'", .path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}
