use cellsense_protocol::{
  DeclarationItem,
  Position,
};

use crate::list::{
  BoundaryPolicy,
  SelectableList,
};

/// How the filter substring is matched against candidate names. Both modes
/// are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
  #[default]
  Prefix,
  Contains,
}

impl FilterMode {
  fn matches(&self, name: &str, needle: &str) -> bool {
    let name = name.to_lowercase();
    match self {
      Self::Prefix => name.starts_with(needle),
      Self::Contains => name.contains(needle),
    }
  }
}

/// The declarations popup model: the full candidate set, the anchored filter
/// window, and the selection. The filtered view is recomputed from
/// (candidates, filter) on every change, never diffed.
#[derive(Debug, Clone)]
pub struct DeclarationsModel {
  open:       bool,
  candidates: Vec<DeclarationItem>,
  /// Indices into `candidates`, in candidate order. Selection clamps.
  view:       SelectableList<usize>,
  filter:     String,
  mode:       FilterMode,
  /// Where filter text begins. Fixed while the popup is open, except for a
  /// server-told correction.
  anchor:     Position,
}

impl DeclarationsModel {
  pub fn new(mode: FilterMode) -> Self {
    Self {
      open:       false,
      candidates: Vec::new(),
      view:       SelectableList::new(BoundaryPolicy::Clamp),
      filter:     String::new(),
      mode,
      anchor:     Position::default(),
    }
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn anchor(&self) -> Position {
    self.anchor
  }

  pub fn set_anchor(&mut self, anchor: Position) {
    self.anchor = anchor;
  }

  pub fn set_anchor_column(&mut self, column: usize) {
    self.anchor.column = column;
  }

  /// Replaces the candidate set, resets the filter and selection, and opens
  /// the popup if anything is visible.
  pub fn set_candidates(&mut self, candidates: Vec<DeclarationItem>) {
    self.candidates = candidates;
    self.filter.clear();
    self.recompute();
    self.view.select(0);
    self.open = !self.view.is_empty();
  }

  /// Applies the raw filter substring (line text between the anchor and the
  /// cursor). A changed filter resets the selection; an emptied view forces
  /// the popup closed.
  pub fn set_filter(&mut self, filter: &str) {
    let changed = self.filter != filter;
    if changed {
      self.filter = filter.to_string();
    }
    self.recompute();
    if changed {
      self.view.select(0);
    }
    if self.open && self.view.is_empty() {
      self.close();
    }
  }

  pub fn filter(&self) -> &str {
    &self.filter
  }

  pub fn move_selected(&mut self, delta: isize) {
    if self.open {
      self.view.move_selected(delta);
    }
  }

  pub fn selected_index(&self) -> usize {
    self.view.selected_index()
  }

  pub fn selected_item(&self) -> Option<&DeclarationItem> {
    self
      .view
      .selected()
      .and_then(|&index| self.candidates.get(index))
  }

  /// The filtered view, in candidate order.
  pub fn visible_items(&self) -> impl Iterator<Item = &DeclarationItem> {
    self
      .view
      .items()
      .iter()
      .filter_map(|&index| self.candidates.get(index))
  }

  pub fn visible_len(&self) -> usize {
    self.view.len()
  }

  pub fn close(&mut self) {
    self.open = false;
    self.candidates.clear();
    self.view.clear();
    self.filter.clear();
  }

  fn recompute(&mut self) {
    let needle = self.filter.to_lowercase();
    let selected = self.view.selected_index();
    let matching: Vec<usize> = self
      .candidates
      .iter()
      .enumerate()
      .filter(|(_, item)| self.mode.matches(&item.name, &needle))
      .map(|(index, _)| index)
      .collect();
    self.view.set_items(matching);
    // An unchanged filter keeps the selection where it was, clamped.
    self.view.select(selected);
  }
}
