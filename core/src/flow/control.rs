// vitrine/src/flow/control.rs

//! Signals for steering a flow and the outcome of a complete run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  /// Keep going with the remaining handlers and steps.
  Continue,
  /// Halt the run now. Nothing else runs, not even the rest of the current step.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step that was not skipped ran to the end.
  Completed,
  /// A handler returned `FlowControl::Stop`.
  Stopped,
}
