//! Completion/diagnostics coordination for a multi-cell editor backed by an
//! out-of-process execution engine.
//!
//! The core is single-threaded and cooperative: the host feeds it keyboard
//! events, buffer-edit and engine-idle notifications, a fixed-cadence tick,
//! and the raw payloads arriving on the engine's reply and broadcast
//! channels. The session reacts by updating the popup models, reconciling
//! diagnostic markers, and issuing requests over the [`EngineLink`] seam.
//! There is no blocking wait anywhere; a request that never gets a reply
//! simply never resumes anything.

mod coordinator;
mod declarations;
mod list;
pub mod reconcile;
mod schedule;
mod session;
mod signatures;
#[cfg(test)]
mod support;
mod surface;
mod trigger;

pub use coordinator::{
  PendingRequest,
  RequestCoordinator,
  RequestOrigin,
};
pub use declarations::{
  DeclarationsModel,
  FilterMode,
};
pub use list::{
  BoundaryPolicy,
  SelectableList,
};
pub use schedule::{
  RevalidationScheduler,
  TickOutcome,
};
pub use session::{
  KeyDisposition,
  Session,
  SessionOptions,
};
pub use signatures::SignaturesModel;
pub use surface::{
  EngineLink,
  NotebookShell,
  SendError,
};
pub use trigger::{
  Intent,
  Key,
  KeyEvent,
  KeyPhase,
  PopupKind,
  TriggerSpec,
  TriggerTable,
  TriggerTarget,
  popup_intent,
};
