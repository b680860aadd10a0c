// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the export engine.

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors surfaced by the export engine.
///
/// Most geometric failures never reach callers: they select the next
/// fallback representation instead. These are the ones that do.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A geometry kernel operation failed.
    #[error("geometry error: {0}")]
    Geometry(#[from] ifc_export_geometry::Error),

    /// Input data is missing or inconsistent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A level list was required but none was supplied.
    #[error("no building levels supplied")]
    NoLevels,

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
