// vitrine/src/flow/definition.rs

//! The `Flow<T, E>` type: construction, structural edits and handler registration.

use crate::error::FlowError;
use crate::flow::context::FlowContext;
use crate::flow::control::FlowControl;
use crate::flow::step::{Handler, SkipCondition, StepDef};
use std::collections::HashMap;
use std::future::Future;

/// An ordered list of named steps run against a shared `FlowContext<T>`.
///
/// Handlers return `Result<FlowControl, E>`. `E` must be constructible from
/// `FlowError` so the engine can report its own failures (a non-optional step
/// without handlers, a missing registry entry) through the same error type.
pub struct Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_if)` triples, in run order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let mut flow = Self {
      steps: Vec::with_capacity(step_defs.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    };
    for (name, optional, skip_if) in step_defs {
      flow.ensure_step_not_exists(name);
      flow.steps.push(StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      });
    }
    flow
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Index of a defined step. A missing step is a setup bug, so this panics.
  fn step_index(&self, step_name: &str) -> usize {
    match self.steps.iter().position(|s| s.name == step_name) {
      Some(idx) => idx,
      None => panic!("Flow setup error: step '{}' is not defined.", step_name),
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!("Flow setup error: step '{}' is already defined.", step_name);
    }
  }

  pub fn insert_before_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<T>>,
  ) {
    let idx = self.step_index(existing_step_name);
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx, StepDef { name, optional, skip_if });
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<T>>,
  ) {
    let idx = self.step_index(existing_step_name);
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef { name, optional, skip_if });
  }

  /// Removes a step and its handlers. Unknown names are ignored.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.steps.iter().position(|s| s.name == step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) {
    let idx = self.step_index(step_name);
    self.steps[idx].optional = optional;
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<T>>) {
    let idx = self.step_index(step_name);
    self.steps[idx].skip_if = skip_if;
  }

  /// Registers a handler that runs before the step's `on` handlers.
  pub fn before<F, UE>(&mut self, step_name: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    self.step_index(step_name);
    let handler = box_handler(handler_fn);
    self.before.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers a main handler for a step. Handlers of one phase run in registration order.
  pub fn on<F, UE>(&mut self, step_name: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    self.step_index(step_name);
    let handler = box_handler(handler_fn);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  pub fn after<F, UE>(&mut self, step_name: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    self.step_index(step_name);
    let handler = box_handler(handler_fn);
    self.after.entry(step_name.to_string()).or_default().push(handler);
  }
}

fn box_handler<T, E, F, UE>(handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static) -> Handler<T, E>
where
  T: 'static + Send + Sync,
  E: 'static,
  F: Future<Output = Result<FlowControl, UE>> + Send + 'static,
  UE: Into<E> + Send + Sync + 'static,
{
  Box::new(move |ctx| {
    let fut = handler_fn(ctx);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}
