// vitrine/src/flow/step.rs

use super::context::FlowContext;
use crate::flow::control::FlowControl;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Evaluated right before a step runs; `true` skips the step.
pub type SkipCondition<T> = Arc<dyn Fn(FlowContext<T>) -> bool + Send + Sync + 'static>;

/// A boxed async step handler.
///
/// Handlers receive their own clone of the run's context. A handler must drop
/// any guard it takes on the context before awaiting.
pub type Handler<T, E> =
  Box<dyn Fn(FlowContext<T>) -> Pin<Box<dyn Future<Output = Result<FlowControl, E>> + Send>> + Send + Sync>;

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
