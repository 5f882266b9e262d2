//! In-memory collaborators for unit tests.

use cellsense_protocol::{
  OutboundRequest,
  Position,
  Span,
};

use crate::surface::{
  EngineLink,
  NotebookShell,
  SendError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMarker {
  pub cell:    usize,
  pub span:    Span,
  pub message: String,
  pub tag:     String,
}

/// A notebook shell backed by plain strings.
#[derive(Debug, Default)]
pub struct FakeShell {
  pub cells:   Vec<String>,
  pub active:  usize,
  pub cursor:  Position,
  pub markers: Vec<FakeMarker>,
}

impl FakeShell {
  pub fn with_cells(cells: &[&str]) -> Self {
    Self {
      cells: cells.iter().map(|cell| cell.to_string()).collect(),
      ..Self::default()
    }
  }

  pub fn marker_messages(&self) -> Vec<&str> {
    self.markers.iter().map(|m| m.message.as_str()).collect()
  }

  pub fn markers_with_tag(&self, tag: &str) -> Vec<&FakeMarker> {
    self.markers.iter().filter(|m| m.tag == tag).collect()
  }

  /// Inserts `text` at the cursor and advances it, like the host widget
  /// applying a keystroke.
  pub fn type_text(&mut self, text: &str) {
    let cursor = self.cursor;
    self.replace_range(self.active, cursor.line, cursor.column, cursor.column, text);
    self.cursor.column += text.chars().count();
  }
}

impl NotebookShell for FakeShell {
  fn cell_count(&self) -> usize {
    self.cells.len()
  }

  fn cell_text(&self, cell: usize) -> Option<String> {
    self.cells.get(cell).cloned()
  }

  fn active_cell(&self) -> usize {
    self.active
  }

  fn cursor(&self) -> Position {
    self.cursor
  }

  fn line_text(&self, cell: usize, line: usize) -> Option<String> {
    self
      .cells
      .get(cell)?
      .split('\n')
      .nth(line)
      .map(str::to_string)
  }

  fn replace_range(
    &mut self,
    cell: usize,
    line: usize,
    start_column: usize,
    end_column: usize,
    text: &str,
  ) {
    let Some(source) = self.cells.get(cell) else {
      return;
    };
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();
    let Some(target) = lines.get_mut(line) else {
      return;
    };
    let prefix: String = target.chars().take(start_column).collect();
    let suffix: String = target.chars().skip(end_column).collect();
    *target = format!("{prefix}{text}{suffix}");
    self.cells[cell] = lines.join("\n");
  }

  fn set_cursor(&mut self, cursor: Position) {
    self.cursor = cursor;
  }

  fn clear_markers(&mut self, tag: &str) {
    self.markers.retain(|m| m.tag != tag);
  }

  fn add_marker(&mut self, cell: usize, span: Span, message: &str, tag: &str) {
    self.markers.push(FakeMarker {
      cell,
      span,
      message: message.to_string(),
      tag: tag.to_string(),
    });
  }
}

/// An engine link that records everything it is asked to send.
#[derive(Debug, Default)]
pub struct FakeLink {
  pub sent:   Vec<OutboundRequest>,
  pub refuse: bool,
}

impl FakeLink {
  pub fn refusing() -> Self {
    Self {
      sent:   Vec::new(),
      refuse: true,
    }
  }
}

impl EngineLink for FakeLink {
  fn send(&mut self, request: OutboundRequest) -> Result<(), SendError> {
    if self.refuse {
      return Err(SendError("channel closed".to_string()));
    }
    self.sent.push(request);
    Ok(())
  }
}
