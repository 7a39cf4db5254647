//! Error types for mesh ingestion and graphics device operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading a mesh from disk.
///
/// All variants are recoverable by the caller: nothing has been uploaded to the
/// GPU when one of these is returned.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The OBJ parser rejected the file.
    #[error("failed to parse mesh file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    /// The file is not a Wavefront OBJ file.
    #[error("unsupported mesh format for {0} (expected a .obj file)")]
    UnsupportedFormat(PathBuf),

    /// A required attribute stream is absent from the file.
    #[error("mesh file {path} is missing required {attribute}")]
    MissingAttribute {
        path: PathBuf,
        attribute: &'static str,
    },
}

/// Errors reported by a [`GraphicsDevice`](crate::gfx::device::GraphicsDevice).
///
/// None of these are retried. Allocation failures abort startup, operation
/// failures abort the current run.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to initialize graphics device: {0}")]
    Initialization(String),

    #[error("failed to allocate {resource}: {reason}")]
    Allocation {
        resource: &'static str,
        reason: String,
    },

    #[error("device operation `{operation}` failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },
}

impl DeviceError {
    pub(crate) fn allocation(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::Allocation {
            resource,
            reason: reason.into(),
        }
    }

    pub(crate) fn operation(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            reason: reason.into(),
        }
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;
