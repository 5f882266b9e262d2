use serde::{
  Deserialize,
  Serialize,
};
use serde_json::{
  Value,
  json,
};
use thiserror::Error;

/// Correlation id attached to a request and echoed back by the engine in the
/// matching reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// The two request kinds the engine accepts. They carry identical content and
/// behave identically; older engine revisions only understand `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
  #[default]
  Intellisense,
  Complete,
}

impl RequestKind {
  pub fn wire_name(&self) -> &'static str {
    match self {
      Self::Intellisense => "intellisense_request",
      Self::Complete => "complete_request",
    }
  }
}

/// A cursor location within one cell, zero-based line and character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
  pub line:   usize,
  pub column: usize,
}

impl Position {
  pub fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }
}

/// Snapshot of every cell's source plus the cursor location, sent with every
/// completion and revalidation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
  pub cells:         Vec<String>,
  pub active_cell:   usize,
  pub cursor:        Position,
  /// Character offset of the cursor within the active cell's text.
  pub cursor_offset: usize,
}

impl RequestEnvelope {
  pub fn new(cells: Vec<String>, active_cell: usize, cursor: Position) -> Self {
    let cursor_offset = cells
      .get(active_cell)
      .map(|text| offset_within(text, cursor))
      .unwrap_or(0);
    Self {
      cells,
      active_cell,
      cursor,
      cursor_offset,
    }
  }

  /// Serializes the envelope into the wire content object. The `text` and
  /// `block` fields are themselves JSON-encoded strings, which is what the
  /// engine expects.
  pub fn to_content(&self) -> Result<Value, EnvelopeError> {
    let block = BlockField {
      selected_index: self.active_cell,
      line:           self.cursor.line,
      ch:             self.cursor.column,
    };
    Ok(json!({
      "text": serde_json::to_string(&self.cells).map_err(EnvelopeError::Encode)?,
      "block": serde_json::to_string(&block).map_err(EnvelopeError::Encode)?,
      "cursor_pos": self.cursor_offset,
    }))
  }
}

/// One request ready for the engine channel: correlation id, wire kind, and
/// the buffer snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
  pub id:       MessageId,
  pub kind:     RequestKind,
  pub envelope: RequestEnvelope,
}

#[derive(Debug, Clone, Serialize)]
struct BlockField {
  #[serde(rename = "selectedIndex")]
  selected_index: usize,
  line:           usize,
  ch:             usize,
}

fn offset_within(text: &str, cursor: Position) -> usize {
  let mut offset = 0;
  for (index, line) in text.split('\n').enumerate() {
    if index == cursor.line {
      return offset + cursor.column.min(line.chars().count());
    }
    offset += line.chars().count() + 1;
  }
  offset.saturating_sub(1)
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
  #[error("failed to encode request content: {0}")]
  Encode(serde_json::Error),
}
