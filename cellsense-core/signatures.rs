use crate::list::{
  BoundaryPolicy,
  SelectableList,
};

/// The method/signature panel model. Unlike the declarations popup it shows
/// one entry at a time, does not filter, and navigation wraps around.
#[derive(Debug, Clone)]
pub struct SignaturesModel {
  open: bool,
  list: SelectableList<String>,
}

impl SignaturesModel {
  pub fn new() -> Self {
    Self {
      open: false,
      list: SelectableList::new(BoundaryPolicy::Wrap),
    }
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  /// Replaces the signature set and opens the panel on the first entry.
  /// An empty set leaves the panel untouched.
  pub fn set_signatures(&mut self, signatures: Vec<String>) {
    if signatures.is_empty() {
      return;
    }
    self.list.set_items(signatures);
    self.open = true;
  }

  pub fn move_selected(&mut self, delta: isize) {
    if self.open {
      self.list.move_selected(delta);
    }
  }

  pub fn selected(&self) -> Option<&str> {
    self.list.selected().map(String::as_str)
  }

  /// One-based "n of len" position for the panel header.
  pub fn position(&self) -> Option<(usize, usize)> {
    if self.list.is_empty() {
      None
    } else {
      Some((self.list.selected_index() + 1, self.list.len()))
    }
  }

  pub fn close(&mut self) {
    self.open = false;
    self.list.clear();
  }
}

impl Default for SignaturesModel {
  fn default() -> Self {
    Self::new()
  }
}
