//! The per-editor session object: one instance owns the popup models, the
//! trigger table, the revalidation scheduler, and the pending-request table,
//! and routes every external event between them. Nothing here is shared
//! across editor instances.

use cellsense_protocol::{
  CompletionReply,
  DiagnosticBatch,
  MessageId,
  Position,
  RequestKind,
};
use serde_json::Value;

use crate::{
  coordinator::{
    RequestCoordinator,
    RequestOrigin,
  },
  declarations::{
    DeclarationsModel,
    FilterMode,
  },
  reconcile,
  schedule::{
    RevalidationScheduler,
    TickOutcome,
  },
  signatures::SignaturesModel,
  surface::{
    EngineLink,
    NotebookShell,
  },
  trigger::{
    Intent,
    KeyEvent,
    KeyPhase,
    PopupKind,
    TriggerTable,
    popup_intent,
  },
};

/// Insert-text characters that collide with identifier grammar and force the
/// committed value into escaping backticks.
const ESCAPE_DELIMITERS: [char; 4] = [' ', '[', ']', '.'];

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
  pub triggers:     TriggerTable,
  pub filter_mode:  FilterMode,
  pub request_kind: RequestKind,
}

/// Whether the host should suppress its default handling of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
  Handled,
  Pass,
}

pub struct Session {
  triggers:     TriggerTable,
  declarations: DeclarationsModel,
  signatures:   SignaturesModel,
  scheduler:    RevalidationScheduler,
  coordinator:  RequestCoordinator,
}

impl Session {
  pub fn new(options: SessionOptions) -> Self {
    Self {
      triggers:     options.triggers,
      declarations: DeclarationsModel::new(options.filter_mode),
      signatures:   SignaturesModel::new(),
      scheduler:    RevalidationScheduler::new(),
      coordinator:  RequestCoordinator::new(options.request_kind),
    }
  }

  pub fn declarations(&self) -> &DeclarationsModel {
    &self.declarations
  }

  pub fn signatures(&self) -> &SignaturesModel {
    &self.signatures
  }

  /// Routes one keyboard event. Order matches the popup contract: an open
  /// declarations popup consumes its own keys first, then the registered
  /// trigger tables get the event, then an open signature panel.
  pub fn handle_key<S, L>(&mut self, shell: &mut S, link: &mut L, event: KeyEvent) -> KeyDisposition
  where
    S: NotebookShell,
    L: EngineLink,
  {
    if self.declarations.is_open() {
      match event.phase {
        KeyPhase::Down => {
          if let Some(intent) = popup_intent(event, PopupKind::Declarations) {
            return self.drive_popup(shell, intent, PopupKind::Declarations);
          }
        },
        // Keyup after ordinary typing: the buffer already changed, so the
        // filter window between anchor and cursor is recomputed.
        KeyPhase::Up => self.refresh_filter(shell),
      }
    }

    let line = current_line(shell);
    if let Some(intent) = self.triggers.evaluate(event, &line) {
      return self.fire_trigger(shell, link, intent);
    }

    if self.signatures.is_open()
      && let Some(intent) = popup_intent(event, PopupKind::Signatures)
    {
      return self.drive_popup(shell, intent, PopupKind::Signatures);
    }

    KeyDisposition::Pass
  }

  /// Host notification that a cell buffer changed. Feeds the revalidation
  /// debounce and keeps the open popup's filter window honest: the popup
  /// closes when the cursor retreats past the anchor, otherwise it refilters.
  pub fn notify_edit<S: NotebookShell>(&mut self, shell: &S) {
    self.scheduler.note_edit();
    if self.declarations.is_open() {
      self.refresh_filter(shell);
    }
  }

  /// Host notification that the engine reported itself idle.
  pub fn notify_engine_idle(&mut self) {
    self.scheduler.note_engine_idle();
  }

  /// The fixed-cadence tick. Fires at most one background revalidation
  /// request, and only after a full quiet tick (see [`RevalidationScheduler`]).
  pub fn tick<S, L>(&mut self, shell: &S, link: &mut L)
  where
    S: NotebookShell,
    L: EngineLink,
  {
    if self.scheduler.tick() == TickOutcome::Fire {
      self.coordinator.request(shell, link, RequestOrigin::Background);
    }
  }

  /// Routes one direct engine reply. Unknown correlation ids (duplicates,
  /// replies outliving the session state) and malformed payloads degrade to
  /// a logged no-op. Replies apply in arrival order; a late reply can still
  /// repopulate a popup the user has dismissed.
  pub fn handle_reply<S: NotebookShell>(&mut self, shell: &S, id: MessageId, payload: &Value) {
    let Some(pending) = self.coordinator.take(id) else {
      log::debug!("ignoring reply with unknown correlation id {id:?}");
      return;
    };
    let reply = match CompletionReply::from_value(payload) {
      Ok(reply) => reply,
      Err(err) => {
        log::debug!("dropping malformed completion reply: {err}");
        return;
      },
    };
    if reply.matches.is_empty() {
      // "No suggestions" is not an error and changes nothing on screen.
      return;
    }

    match pending.origin {
      RequestOrigin::Background => {},
      RequestOrigin::Declarations => {
        self.signatures.close();
        self.declarations.set_candidates(reply.matches);
        if let Some(column) = reply.filter_start_index {
          self.declarations.set_anchor_column(column);
        }
        self.refresh_filter(shell);
      },
      RequestOrigin::Signatures => {
        self.declarations.close();
        let signatures = reply.matches.into_iter().map(|item| item.name).collect();
        self.signatures.set_signatures(signatures);
      },
    }
  }

  /// Routes one broadcast-channel message. Anything that parses as a
  /// diagnostics payload replaces the applied marker batch; everything else
  /// is unrelated traffic and is ignored.
  pub fn handle_broadcast<S: NotebookShell>(&mut self, shell: &mut S, payload: &Value) {
    match DiagnosticBatch::from_value(payload) {
      Ok(batch) => reconcile::apply(shell, &batch),
      Err(err) => log::debug!("ignoring non-diagnostic broadcast: {err}"),
    }
  }

  fn fire_trigger<S, L>(&mut self, shell: &S, link: &mut L, intent: Intent) -> KeyDisposition
  where
    S: NotebookShell,
    L: EngineLink,
  {
    match intent {
      Intent::OpenDeclarations { prevent_default } => {
        // The cursor at trigger time is the provisional anchor; the reply
        // may still correct it.
        self.declarations.set_anchor(shell.cursor());
        self
          .coordinator
          .request(shell, link, RequestOrigin::Declarations);
        disposition(prevent_default)
      },
      Intent::OpenSignatures { prevent_default } => {
        self
          .coordinator
          .request(shell, link, RequestOrigin::Signatures);
        disposition(prevent_default)
      },
      // The trigger tables only produce open intents.
      _ => KeyDisposition::Pass,
    }
  }

  fn drive_popup<S: NotebookShell>(
    &mut self,
    shell: &mut S,
    intent: Intent,
    popup: PopupKind,
  ) -> KeyDisposition {
    match intent {
      Intent::Dismiss { prevent_default } => {
        match popup {
          PopupKind::Declarations => self.declarations.close(),
          PopupKind::Signatures => self.signatures.close(),
        }
        disposition(prevent_default)
      },
      Intent::Navigate { delta } => {
        match popup {
          PopupKind::Declarations => self.declarations.move_selected(delta),
          PopupKind::Signatures => self.signatures.move_selected(delta),
        }
        KeyDisposition::Handled
      },
      Intent::Commit => {
        self.commit(shell);
        KeyDisposition::Handled
      },
      _ => KeyDisposition::Pass,
    }
  }

  /// Replaces the text between the filter anchor and the cursor with the
  /// selected item's insert text and closes the popup.
  fn commit<S: NotebookShell>(&mut self, shell: &mut S) {
    let Some(item) = self.declarations.selected_item() else {
      self.declarations.close();
      return;
    };
    let insert = escape_delimited(item.insert_text());
    let anchor = self.declarations.anchor();
    let cursor = shell.cursor();
    shell.replace_range(
      shell.active_cell(),
      cursor.line,
      anchor.column,
      cursor.column,
      &insert,
    );
    shell.set_cursor(Position::new(
      cursor.line,
      anchor.column + insert.chars().count(),
    ));
    self.declarations.close();
  }

  fn refresh_filter<S: NotebookShell + ?Sized>(&mut self, shell: &S) {
    let cursor = shell.cursor();
    let anchor = self.declarations.anchor();
    if cursor.line != anchor.line || cursor.column < anchor.column {
      self.declarations.close();
      return;
    }
    let line = shell
      .line_text(shell.active_cell(), anchor.line)
      .unwrap_or_default();
    let filter = slice_columns(&line, anchor.column, cursor.column);
    self.declarations.set_filter(&filter);
  }
}

fn disposition(prevent_default: bool) -> KeyDisposition {
  if prevent_default {
    KeyDisposition::Handled
  } else {
    KeyDisposition::Pass
  }
}

fn current_line<S: NotebookShell + ?Sized>(shell: &S) -> String {
  shell
    .line_text(shell.active_cell(), shell.cursor().line)
    .unwrap_or_default()
}

fn slice_columns(line: &str, start: usize, end: usize) -> String {
  line
    .chars()
    .skip(start)
    .take(end.saturating_sub(start))
    .collect()
}

fn escape_delimited(text: &str) -> String {
  if text.contains(&ESCAPE_DELIMITERS[..]) {
    format!("``{text}``")
  } else {
    text.to_string()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    support::{
      FakeLink,
      FakeShell,
    },
    trigger::{
      Key,
      TriggerSpec,
      TriggerTarget,
    },
  };

  fn options() -> SessionOptions {
    let mut triggers = TriggerTable::new(
      vec!["#load".into(), "#r".into()],
      vec!["#load \"".into(), "#r \"".into()],
    );
    triggers.add(TriggerSpec {
      key:             Key::Char('.'),
      shift:           false,
      ctrl:            false,
      phase:           KeyPhase::Up,
      prevent_default: false,
      target:          TriggerTarget::Declarations,
    });
    triggers.add(TriggerSpec {
      key:             Key::Char('('),
      shift:           true,
      ctrl:            false,
      phase:           KeyPhase::Up,
      prevent_default: false,
      target:          TriggerTarget::Signatures,
    });
    SessionOptions {
      triggers,
      filter_mode: FilterMode::Prefix,
      request_kind: RequestKind::Intellisense,
    }
  }

  fn keyup(key: Key) -> KeyEvent {
    KeyEvent::new(key, KeyPhase::Up)
  }

  fn keydown(key: Key) -> KeyEvent {
    KeyEvent::new(key, KeyPhase::Down)
  }

  fn reply(names: &[&str]) -> Value {
    json!({
      "matches": names
        .iter()
        .map(|name| json!({ "name": name }))
        .collect::<Vec<_>>()
    })
  }

  fn open_declarations(
    session: &mut Session,
    shell: &mut FakeShell,
    link: &mut FakeLink,
    names: &[&str],
  ) -> MessageId {
    session.handle_key(shell, link, keyup(Key::Char('.')));
    let id = link.sent.last().expect("request sent").id;
    session.handle_reply(shell, id, &reply(names));
    id
  }

  #[test]
  fn trigger_request_reply_opens_and_filters_the_popup() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["List."]);
    shell.cursor = Position::new(0, 5);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["map", "mapi", "max"]);
    assert!(session.declarations().is_open());
    assert_eq!(session.declarations().visible_len(), 3);

    // Typing "ma" then "p" narrows the anchored filter window.
    shell.type_text("ma");
    session.notify_edit(&shell);
    assert_eq!(session.declarations().filter(), "ma");
    assert_eq!(session.declarations().visible_len(), 3);

    shell.type_text("p");
    session.notify_edit(&shell);
    assert_eq!(session.declarations().filter(), "map");
    assert_eq!(session.declarations().visible_len(), 2);
  }

  #[test]
  fn commit_rewrites_the_anchor_window_and_closes() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["List."]);
    shell.cursor = Position::new(0, 5);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["map", "mapi", "max"]);
    shell.type_text("ma");
    session.notify_edit(&shell);

    let disposition = session.handle_key(&mut shell, &mut link, keydown(Key::Enter));
    assert_eq!(disposition, KeyDisposition::Handled);
    assert_eq!(shell.cells[0], "List.map");
    assert_eq!(shell.cursor, Position::new(0, 8));
    assert!(!session.declarations().is_open());
  }

  #[test]
  fn commit_escapes_delimited_insert_text() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["ctx."]);
    shell.cursor = Position::new(0, 4);
    let mut link = FakeLink::default();

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let id = link.sent[0].id;
    session.handle_reply(
      &shell,
      id,
      &json!({ "matches": [{ "name": "Total Count" }] }),
    );
    session.handle_key(&mut shell, &mut link, keydown(Key::Tab));
    assert_eq!(shell.cells[0], "ctx.``Total Count``");
    assert_eq!(shell.cursor.column, 4 + "``Total Count``".chars().count());
  }

  #[test]
  fn navigation_clamps_and_escape_dismisses() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x."]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["a", "b", "c"]);
    session.handle_key(&mut shell, &mut link, keydown(Key::Down));
    session.handle_key(&mut shell, &mut link, keydown(Key::PageDown));
    assert_eq!(session.declarations().selected_index(), 2);

    let disposition = session.handle_key(&mut shell, &mut link, keydown(Key::Escape));
    assert_eq!(disposition, KeyDisposition::Handled);
    assert!(!session.declarations().is_open());
  }

  #[test]
  fn arrow_out_dismisses_but_leaves_default_handling() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x."]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["aa", "ab"]);
    let disposition = session.handle_key(&mut shell, &mut link, keydown(Key::Left));
    assert_eq!(disposition, KeyDisposition::Pass);
    assert!(!session.declarations().is_open());
  }

  #[test]
  fn cursor_retreat_before_the_anchor_closes_the_popup() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x.ab"]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let id = link.sent[0].id;
    shell.cursor = Position::new(0, 4);
    session.handle_reply(&shell, id, &reply(&["ab", "abc"]));
    assert!(session.declarations().is_open());

    // Backspacing past the anchor column.
    shell.cursor = Position::new(0, 1);
    session.notify_edit(&shell);
    assert!(!session.declarations().is_open());
  }

  #[test]
  fn server_anchor_correction_rebuilds_the_filter() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["List.ma"]);
    // Trigger fired late: cursor already sits after "ma".
    shell.cursor = Position::new(0, 7);
    let mut link = FakeLink::default();

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let id = link.sent[0].id;
    session.handle_reply(
      &shell,
      id,
      &json!({
        "matches": [{ "name": "map" }, { "name": "mapi" }, { "name": "sum" }],
        "filter_start_index": 5
      }),
    );
    assert!(session.declarations().is_open());
    assert_eq!(session.declarations().filter(), "ma");
    assert_eq!(session.declarations().visible_len(), 2);
  }

  #[test]
  fn empty_reply_changes_nothing() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x."]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["aa"]);
    assert!(session.declarations().is_open());

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let id = link.sent.last().unwrap().id;
    session.handle_reply(&shell, id, &reply(&[]));
    // Prior candidates stay on screen.
    assert!(session.declarations().is_open());
    assert_eq!(session.declarations().visible_len(), 1);
  }

  #[test]
  fn malformed_and_duplicate_replies_are_no_ops() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x."]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let id = link.sent[0].id;
    session.handle_reply(&shell, id, &json!("garbage"));
    assert!(!session.declarations().is_open());

    // The entry was consumed by the malformed reply; a well-formed duplicate
    // finds no correlation entry.
    session.handle_reply(&shell, id, &reply(&["aa"]));
    assert!(!session.declarations().is_open());
  }

  #[test]
  fn late_reply_can_reopen_a_dismissed_popup() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x."]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["aa"]);
    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let second = link.sent.last().unwrap().id;
    session.handle_key(&mut shell, &mut link, keydown(Key::Escape));
    assert!(!session.declarations().is_open());

    // In-flight requests are never cancelled; the reply lands anyway.
    session.handle_reply(&shell, second, &reply(&["ab"]));
    assert!(session.declarations().is_open());
  }

  #[test]
  fn signature_reply_opens_the_panel_and_closes_declarations() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["printfn ("]);
    shell.cursor = Position::new(0, 9);
    let mut link = FakeLink::default();

    open_declarations(&mut session, &mut shell, &mut link, &["printfn"]);

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('(')).with_shift());
    let id = link.sent.last().unwrap().id;
    session.handle_reply(&shell, id, &reply(&["string -> unit", "format -> unit"]));
    assert!(session.signatures().is_open());
    assert!(!session.declarations().is_open());
    assert_eq!(session.signatures().position(), Some((1, 2)));

    // Signature navigation wraps.
    session.handle_key(&mut shell, &mut link, keydown(Key::Up));
    assert_eq!(session.signatures().position(), Some((2, 2)));
  }

  #[test]
  fn background_revalidation_fires_after_a_quiet_tick() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["let x = 1"]);
    let mut link = FakeLink::default();

    session.notify_edit(&shell);
    session.notify_edit(&shell);
    session.tick(&shell, &mut link);
    assert!(link.sent.is_empty());
    session.tick(&shell, &mut link);
    assert_eq!(link.sent.len(), 1);
    session.tick(&shell, &mut link);
    assert_eq!(link.sent.len(), 1);

    // The background reply never touches popup state.
    let id = link.sent[0].id;
    session.handle_reply(&shell, id, &reply(&["stale", "candidates"]));
    assert!(!session.declarations().is_open());
    assert!(!session.signatures().is_open());
  }

  #[test]
  fn engine_idle_feeds_the_same_debounce() {
    let mut session = Session::new(options());
    let shell = FakeShell::with_cells(&["let x = 1"]);
    let mut link = FakeLink::default();

    session.notify_engine_idle();
    session.tick(&shell, &mut link);
    session.tick(&shell, &mut link);
    assert_eq!(link.sent.len(), 1);
  }

  #[test]
  fn broadcast_diagnostics_replace_markers() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["let y = x", "y"]);

    let payload = json!({
      "content": {
        "data": {
          "errors": [{
            "CellNumber": 0,
            "StartLine": 0,
            "StartColumn": 8,
            "EndLine": 0,
            "EndColumn": 9,
            "Message": "The value or constructor 'x' is not defined"
          }]
        }
      }
    });
    session.handle_broadcast(&mut shell, &payload);
    assert_eq!(shell.marker_messages().len(), 1);

    // Unrelated broadcast traffic is ignored, markers stay.
    session.handle_broadcast(&mut shell, &json!({ "content": { "name": "stdout" } }));
    assert_eq!(shell.marker_messages().len(), 1);
  }

  #[test]
  fn unescaped_insert_text_is_committed_verbatim() {
    assert_eq!(escape_delimited("map"), "map");
    assert_eq!(escape_delimited("Total Count"), "``Total Count``");
    assert_eq!(escape_delimited("item[0]"), "``item[0]``");
    assert_eq!(escape_delimited("System.IO"), "``System.IO``");
  }

  #[test]
  fn value_wins_over_name_on_commit() {
    let mut session = Session::new(options());
    let mut shell = FakeShell::with_cells(&["x."]);
    shell.cursor = Position::new(0, 2);
    let mut link = FakeLink::default();

    session.handle_key(&mut shell, &mut link, keyup(Key::Char('.')));
    let id = link.sent[0].id;
    session.handle_reply(
      &shell,
      id,
      &json!({ "matches": [{ "name": "pretty name", "value": "actual_value" }] }),
    );
    session.handle_key(&mut shell, &mut link, keydown(Key::Enter));
    assert_eq!(shell.cells[0], "x.actual_value");
  }
}
