use cellsense_protocol::{
  OutboundRequest,
  Position,
  Span,
};
use thiserror::Error;

/// The host notebook's editing surface: cell buffers, cursor, and positional
/// markers. The core never stores text itself; every read and write crosses
/// this seam.
pub trait NotebookShell {
  fn cell_count(&self) -> usize;
  fn cell_text(&self, cell: usize) -> Option<String>;
  /// Index of the cell that currently owns the cursor.
  fn active_cell(&self) -> usize;
  /// Cursor location within the active cell.
  fn cursor(&self) -> Position;
  fn line_text(&self, cell: usize, line: usize) -> Option<String>;
  /// Replaces `[start_column, end_column)` of one line in one cell.
  fn replace_range(
    &mut self,
    cell: usize,
    line: usize,
    start_column: usize,
    end_column: usize,
    text: &str,
  );
  fn set_cursor(&mut self, cursor: Position);
  /// Removes every marker carrying `tag`, in every cell. Markers with other
  /// tags must survive.
  fn clear_markers(&mut self, tag: &str);
  fn add_marker(&mut self, cell: usize, span: Span, message: &str, tag: &str);
}

/// The already-connected engine channel. Sending registers nothing and waits
/// for nothing; replies come back through the session entry points.
pub trait EngineLink {
  fn send(&mut self, request: OutboundRequest) -> Result<(), SendError>;
}

#[derive(Debug, Error)]
#[error("engine channel unavailable: {0}")]
pub struct SendError(pub String);
