//! Maps raw keyboard events onto completion intents: registered trigger
//! tables for opening the popups, plus the fixed key handling that drives an
//! already-open popup.

use smallvec::SmallVec;

/// Normalized key identity. Printable keys carry the produced character;
/// everything the popups care about beyond that is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
  Char(char),
  Enter,
  Tab,
  Escape,
  Backspace,
  Left,
  Right,
  Up,
  Down,
  PageUp,
  PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
  Down,
  Up,
}

/// One raw keyboard event as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
  pub key:   Key,
  pub shift: bool,
  pub ctrl:  bool,
  pub phase: KeyPhase,
}

impl KeyEvent {
  pub fn new(key: Key, phase: KeyPhase) -> Self {
    Self {
      key,
      shift: false,
      ctrl: false,
      phase,
    }
  }

  pub fn with_shift(mut self) -> Self {
    self.shift = true;
    self
  }

  pub fn with_ctrl(mut self) -> Self {
    self.ctrl = true;
    self
  }
}

/// Which popup a registered trigger opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTarget {
  Declarations,
  Signatures,
}

/// One registered popup trigger. Key and both modifier flags must match the
/// event exactly for the spec to fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
  pub key:             Key,
  pub shift:           bool,
  pub ctrl:            bool,
  pub phase:           KeyPhase,
  pub prevent_default: bool,
  pub target:          TriggerTarget,
}

impl TriggerSpec {
  fn matches(&self, event: KeyEvent) -> bool {
    self.key == event.key && self.shift == event.shift && self.ctrl == event.ctrl
  }
}

/// What a keyboard event means to the session this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
  OpenDeclarations { prevent_default: bool },
  OpenSignatures { prevent_default: bool },
  Dismiss { prevent_default: bool },
  Navigate { delta: isize },
  Commit,
}

/// Which popup an open-popup key event is being interpreted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
  Declarations,
  Signatures,
}

const PAGE_JUMP: isize = 5;

/// Fixed key handling for an open popup: Escape and the horizontal arrows
/// dismiss, vertical arrows and paging navigate, Enter/Tab commit (the
/// declarations popup only). Arrow-out leaves default handling alone so the
/// cursor still moves.
pub fn popup_intent(event: KeyEvent, popup: PopupKind) -> Option<Intent> {
  if event.phase != KeyPhase::Down {
    return None;
  }
  match event.key {
    Key::Escape => Some(Intent::Dismiss {
      prevent_default: true,
    }),
    Key::Left | Key::Right => Some(Intent::Dismiss {
      prevent_default: false,
    }),
    Key::Up => Some(Intent::Navigate { delta: -1 }),
    Key::Down => Some(Intent::Navigate { delta: 1 }),
    Key::PageUp => Some(Intent::Navigate { delta: -PAGE_JUMP }),
    Key::PageDown => Some(Intent::Navigate { delta: PAGE_JUMP }),
    Key::Enter | Key::Tab if popup == PopupKind::Declarations => Some(Intent::Commit),
    _ => None,
  }
}

/// The registered trigger tables, partitioned by target and phase. Specs are
/// tested in insertion order, declarations before signatures, and the first
/// match ends the cycle.
#[derive(Debug, Clone, Default)]
pub struct TriggerTable {
  declarations_up:    SmallVec<[TriggerSpec; 4]>,
  declarations_down:  SmallVec<[TriggerSpec; 4]>,
  signatures_up:      SmallVec<[TriggerSpec; 4]>,
  signatures_down:    SmallVec<[TriggerSpec; 4]>,
  directive_prefixes: Vec<String>,
  quote_templates:    Vec<String>,
}

impl TriggerTable {
  /// `directive_prefixes` gate the path-separator triggers; `quote_templates`
  /// gate the quote trigger (see [`TriggerTable::evaluate`]).
  pub fn new(directive_prefixes: Vec<String>, quote_templates: Vec<String>) -> Self {
    Self {
      directive_prefixes,
      quote_templates,
      ..Self::default()
    }
  }

  pub fn add(&mut self, spec: TriggerSpec) {
    let list = match (spec.target, spec.phase) {
      (TriggerTarget::Declarations, KeyPhase::Up) => &mut self.declarations_up,
      (TriggerTarget::Declarations, KeyPhase::Down) => &mut self.declarations_down,
      (TriggerTarget::Signatures, KeyPhase::Up) => &mut self.signatures_up,
      (TriggerTarget::Signatures, KeyPhase::Down) => &mut self.signatures_down,
    };
    list.push(spec);
  }

  /// Tests the event against the declarations lists first, then the
  /// signatures lists, for the event's phase. `line` is the text of the line
  /// the cursor is on, used by the directive guard.
  pub fn evaluate(&self, event: KeyEvent, line: &str) -> Option<Intent> {
    let (declarations, signatures) = match event.phase {
      KeyPhase::Up => (&self.declarations_up, &self.signatures_up),
      KeyPhase::Down => (&self.declarations_down, &self.signatures_down),
    };

    for spec in declarations {
      if spec.matches(event) && self.guard_permits(spec, line) {
        return Some(Intent::OpenDeclarations {
          prevent_default: spec.prevent_default,
        });
      }
    }
    for spec in signatures {
      if spec.matches(event) {
        return Some(Intent::OpenSignatures {
          prevent_default: spec.prevent_default,
        });
      }
    }
    None
  }

  /// Path separators and quotes are legal inside ordinary identifiers and
  /// strings, so those triggers only fire on directive lines: separators
  /// require a directive prefix, quotes require the line to be exactly a
  /// directive-start template.
  fn guard_permits(&self, spec: &TriggerSpec, line: &str) -> bool {
    match spec.key {
      Key::Char('/') | Key::Char('\\') => {
        self.directive_prefixes.iter().any(|p| line.starts_with(p))
      },
      Key::Char('"') => self.quote_templates.iter().any(|t| line == t),
      _ => true,
    }
  }
}
