use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConvertError – every way a conversion run can fail
// ---------------------------------------------------------------------------

/// Errors raised while converting measurement pickles.
///
/// All of them are fatal for the run: nothing is written once one occurs.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Listing the input directory or opening a file failed.
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not a pickle this decoder understands.
    #[error("{} is not a valid pickle", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_pickle::Error,
    },

    /// The top-level container holds no elements.
    #[error("{}: top-level container is empty", .path.display())]
    EmptyContainer { path: PathBuf },

    /// The file name carries no `<digit>.<digits>V` voltage.
    #[error("no voltage (e.g. \"1.05V\") found in file name '{file_name}'")]
    MissingVoltage { file_name: String },

    /// A decoded value does not have the expected shape.
    #[error("{}: {context}: expected {expected}, found {found}", .path.display())]
    Shape {
        path: PathBuf,
        context: String,
        expected: &'static str,
        found: String,
    },

    /// The report could not be serialized.
    #[error("encoding frequency report")]
    Encode(#[from] serde_json::Error),

    /// The report could not be written to disk.
    #[error("writing {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
