use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::request::Position;

/// A marker range within one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
  pub start: Position,
  pub end:   Position,
}

/// One positional error marker reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub cell:    usize,
  pub span:    Span,
  pub message: String,
}

/// The full, self-contained marker set for the current document state. A new
/// batch always replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagnosticBatch {
  pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBatch {
  /// Decodes a broadcast payload of the shape `{content: {data: {errors: [..]}}}`.
  pub fn from_value(value: &Value) -> Result<Self, DiagnosticsError> {
    let payload: BroadcastPayload = serde_json::from_value(value.clone())?;
    Ok(payload.into_batch())
  }
}

#[derive(Debug, Deserialize)]
struct BroadcastPayload {
  content: BroadcastContent,
}

impl BroadcastPayload {
  fn into_batch(self) -> DiagnosticBatch {
    DiagnosticBatch {
      diagnostics: self
        .content
        .data
        .errors
        .into_iter()
        .map(ErrorPayload::into_diagnostic)
        .collect(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct BroadcastContent {
  data: BroadcastData,
}

#[derive(Debug, Deserialize)]
struct BroadcastData {
  #[serde(default)]
  errors: Vec<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorPayload {
  cell_number:  usize,
  start_line:   usize,
  start_column: usize,
  end_line:     usize,
  end_column:   usize,
  message:      String,
}

impl ErrorPayload {
  fn into_diagnostic(self) -> Diagnostic {
    Diagnostic {
      cell:    self.cell_number,
      span:    Span {
        start: Position::new(self.start_line, self.start_column),
        end:   Position::new(self.end_line, self.end_column),
      },
      message: self.message,
    }
  }
}

#[derive(Debug, Error)]
pub enum DiagnosticsError {
  #[error("diagnostics payload decode failed: {0}")]
  Decode(#[from] serde_json::Error),
}
