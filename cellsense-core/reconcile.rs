use cellsense_protocol::DiagnosticBatch;

use crate::surface::NotebookShell;

/// Tag attached to every marker this module paints, so reconciliation can
/// clear its own markers without touching user-created ones.
pub const DIAGNOSTIC_TAG: &str = "engine-diagnostic";

/// Replaces the previously applied diagnostic markers with a new batch:
/// every tagged marker across every cell is removed, then each diagnostic in
/// the batch paints one tagged range with its message as hover text. A
/// diagnostic pointing at a cell that no longer exists is skipped without
/// affecting the rest of the batch.
pub fn apply<S: NotebookShell + ?Sized>(shell: &mut S, batch: &DiagnosticBatch) {
  shell.clear_markers(DIAGNOSTIC_TAG);

  let cell_count = shell.cell_count();
  for diagnostic in &batch.diagnostics {
    if diagnostic.cell >= cell_count {
      log::debug!(
        "skipping diagnostic for missing cell {} ({} cells present)",
        diagnostic.cell,
        cell_count
      );
      continue;
    }
    shell.add_marker(
      diagnostic.cell,
      diagnostic.span,
      &diagnostic.message,
      DIAGNOSTIC_TAG,
    );
  }
}
