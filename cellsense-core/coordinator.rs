use std::collections::HashMap;

use cellsense_protocol::{
  MessageId,
  OutboundRequest,
  RequestEnvelope,
  RequestKind,
};

use crate::surface::{
  EngineLink,
  NotebookShell,
};

/// Why a request was issued, and therefore where its reply routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
  Declarations,
  Signatures,
  /// Idle revalidation: the reply's candidate payload is ignored and only
  /// the diagnostics it provokes matter.
  Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
  pub origin: RequestOrigin,
}

/// Builds request envelopes, stamps them with correlation ids, and keeps the
/// pending table that routes replies back to the right model.
///
/// Requests are never queued and never cancelled: overlapping requests are
/// allowed, and replies apply in arrival order. An entry whose reply never
/// arrives stays in the table for the life of the session.
#[derive(Debug)]
pub struct RequestCoordinator {
  kind:    RequestKind,
  next_id: u64,
  pending: HashMap<MessageId, PendingRequest>,
}

impl RequestCoordinator {
  pub fn new(kind: RequestKind) -> Self {
    Self {
      kind,
      next_id: 0,
      pending: HashMap::new(),
    }
  }

  /// Snapshots every cell plus the cursor and sends one request. Returns the
  /// correlation id, or `None` when the channel refused the send (logged,
  /// never surfaced -- the popup simply never opens).
  pub fn request<S, L>(&mut self, shell: &S, link: &mut L, origin: RequestOrigin) -> Option<MessageId>
  where
    S: NotebookShell + ?Sized,
    L: EngineLink + ?Sized,
  {
    let cells: Vec<String> = (0..shell.cell_count())
      .map(|cell| shell.cell_text(cell).unwrap_or_default())
      .collect();
    let envelope = RequestEnvelope::new(cells, shell.active_cell(), shell.cursor());

    let id = MessageId(self.next_id);
    self.next_id = self.next_id.wrapping_add(1);

    let request = OutboundRequest {
      id,
      kind: self.kind,
      envelope,
    };
    if let Err(err) = link.send(request) {
      log::warn!("dropping completion request {id:?}: {err}");
      return None;
    }

    self.pending.insert(id, PendingRequest { origin });
    Some(id)
  }

  /// Consumes the pending entry for a reply. Duplicate or unsolicited
  /// replies return `None` and must be ignored by the caller.
  pub fn take(&mut self, id: MessageId) -> Option<PendingRequest> {
    self.pending.remove(&id)
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }
}
