//! JSON literal document reader and writer.
//!
//! A document wraps the literal form of a graph frame with its schema
//! version, a timestamp and the metric lists.

use super::writer::{calculate_file_size, prepare_output_path};
use crate::graphframe::{GraphFrame, LiteralNode};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::{LiteralError, OutputError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk form of a graph frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralDocument {
    pub version: String,

    /// RFC3339 timestamp
    pub generated_at: String,

    #[serde(default)]
    pub exc_metrics: Vec<String>,

    #[serde(default)]
    pub inc_metrics: Vec<String>,

    pub graph: Vec<LiteralNode>,
}

impl LiteralDocument {
    pub fn from_frame(gf: &GraphFrame) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            exc_metrics: gf.exc_metrics().to_vec(),
            inc_metrics: gf.inc_metrics().to_vec(),
            graph: gf.to_literal(),
        }
    }

    /// Rebuild the graph frame, using the stored metric lists when present
    pub fn to_frame(&self) -> Result<GraphFrame, LiteralError> {
        if self.exc_metrics.is_empty() && self.inc_metrics.is_empty() {
            GraphFrame::from_literal(&self.graph)
        } else {
            GraphFrame::from_literal_with_metrics(
                &self.graph,
                self.exc_metrics.clone(),
                self.inc_metrics.clone(),
            )
        }
    }
}

/// Write a graph frame to a JSON literal document
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_literal(gf: &GraphFrame, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    write_document(&LiteralDocument::from_frame(gf), output_path)
}

pub fn write_document(
    document: &LiteralDocument,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing literal document to: {}", output_path.display());

    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, document).map_err(OutputError::SerializationFailed)?;

    info!(
        "Literal document written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a document to a pretty JSON string
pub fn document_to_string(document: &LiteralDocument) -> Result<String, OutputError> {
    serde_json::to_string_pretty(document).map_err(OutputError::SerializationFailed)
}

/// Read a literal document from a JSON file
///
/// Accepts either a full document or a bare array of literal roots.
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
/// * `OutputError::UnsupportedVersion` - major version differs from ours
pub fn read_document(input_path: impl AsRef<Path>) -> Result<LiteralDocument, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading literal document from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let value: serde_json::Value =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    let document = if value.is_array() {
        LiteralDocument {
            version: SCHEMA_VERSION.to_string(),
            generated_at: String::new(),
            exc_metrics: Vec::new(),
            inc_metrics: Vec::new(),
            graph: serde_json::from_value(value).map_err(OutputError::SerializationFailed)?,
        }
    } else {
        serde_json::from_value(value).map_err(OutputError::SerializationFailed)?
    };

    if major(&document.version) != major(SCHEMA_VERSION) {
        return Err(OutputError::UnsupportedVersion(document.version));
    }

    debug!(
        "Literal document loaded: version {}, {} roots",
        document.version,
        document.graph.len()
    );

    Ok(document)
}

/// Read a JSON literal document straight into a graph frame
pub fn read_literal(input_path: impl AsRef<Path>) -> Result<GraphFrame, OutputError> {
    let document = read_document(input_path)?;
    Ok(document.to_frame()?)
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
