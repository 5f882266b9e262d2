//! Wire-level types for talking to the execution engine: request envelopes,
//! the two accepted reply shapes, and diagnostics broadcast payloads. Shape
//! differences between engine protocol revisions are normalized here so the
//! coordination layer only ever sees one internal type per message.

mod diagnostics;
mod reply;
mod request;

pub use diagnostics::{
  Diagnostic,
  DiagnosticBatch,
  DiagnosticsError,
  Span,
};
pub use reply::{
  CompletionReply,
  DeclarationItem,
  ReplyError,
};
pub use request::{
  EnvelopeError,
  MessageId,
  OutboundRequest,
  Position,
  RequestEnvelope,
  RequestKind,
};
