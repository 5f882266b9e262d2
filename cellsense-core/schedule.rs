//! Quiet-period debounce for whole-buffer revalidation, driven by a fixed
//! cadence tick instead of restartable timers. Each event source moves
//! through a two-phase pipeline: the first tick after an event only demotes
//! "seen recently" to "seen", and a request fires on the first tick where
//! something is pending but nothing is recent. A continuous burst of edits
//! therefore never fires mid-burst; the request goes out once, one to two
//! ticks after the burst ends.

/// Where one event source sits in the debounce pipeline. `PendingFirstTick`
/// is "seen since the last fire, and seen since the last tick";
/// `ReadyToFire` is "seen since the last fire, but quiet for a full tick".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
  #[default]
  Idle,
  PendingFirstTick,
  ReadyToFire,
}

impl Phase {
  fn settle(&mut self) {
    if *self == Phase::PendingFirstTick {
      *self = Phase::ReadyToFire;
    }
  }
}

/// What one cadence tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
  /// Nothing has happened since the last fire.
  Quiet,
  /// Something happened within the last tick; wait one more.
  Deferred,
  /// The quiet period elapsed; issue a background revalidation now.
  Fire,
}

/// Two-source debounce state: buffer edits and engine idle notifications are
/// tracked separately but fire a single combined revalidation.
#[derive(Debug, Default)]
pub struct RevalidationScheduler {
  edits:       Phase,
  engine_idle: Phase,
}

impl RevalidationScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn note_edit(&mut self) {
    self.edits = Phase::PendingFirstTick;
  }

  pub fn note_engine_idle(&mut self) {
    self.engine_idle = Phase::PendingFirstTick;
  }

  pub fn tick(&mut self) -> TickOutcome {
    if self.edits == Phase::Idle && self.engine_idle == Phase::Idle {
      return TickOutcome::Quiet;
    }
    if self.edits == Phase::PendingFirstTick || self.engine_idle == Phase::PendingFirstTick {
      self.edits.settle();
      self.engine_idle.settle();
      return TickOutcome::Deferred;
    }
    self.edits = Phase::Idle;
    self.engine_idle = Phase::Idle;
    TickOutcome::Fire
  }
}
