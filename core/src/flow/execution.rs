// vitrine/src/flow/execution.rs

//! `Flow::run`: walks the steps in order and drives each phase's handlers.

use crate::error::FlowError;
use crate::flow::context::FlowContext;
use crate::flow::control::{FlowControl, FlowOutcome};
use crate::flow::definition::Flow;
use crate::flow::step::{Handler, StepDef};
use tracing::{event, instrument, span, Instrument, Level};

/// What running one step (or one phase of it) produced.
enum StepResult {
  Continue,
  Stopped,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the flow against `ctx`.
  ///
  /// Handler errors are returned unchanged; engine failures such as a
  /// non-optional step without handlers are converted through `E: From<FlowError>`.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<T>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, E> {
    event!(Level::DEBUG, "Flow run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "flow_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );
      if let StepResult::Stopped = self.run_step(step_def, &ctx).instrument(step_span).await? {
        return Ok(FlowOutcome::Stopped);
      }
    }

    event!(Level::DEBUG, "Flow run completed.");
    Ok(FlowOutcome::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<T>, ctx: &FlowContext<T>) -> Result<StepResult, E> {
    let step_name = step_def.name.as_str();

    if let Some(skip_if) = &step_def.skip_if {
      if skip_if(ctx.clone()) {
        event!(Level::INFO, "Step skipped by its condition.");
        return Ok(StepResult::Continue);
      }
    }

    let has_handlers = [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).is_some_and(|handlers| !handlers.is_empty()));

    if !has_handlers {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, passing over it.");
        return Ok(StepResult::Continue);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(E::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase_name, phase) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      if let Some(handlers) = phase.get(step_name) {
        if let StepResult::Stopped = run_phase(phase_name, handlers, ctx).await? {
          return Ok(StepResult::Stopped);
        }
      }
    }
    event!(Level::DEBUG, "Step finished.");
    Ok(StepResult::Continue)
  }
}

async fn run_phase<T, E>(phase_name: &str, handlers: &[Handler<T, E>], ctx: &FlowContext<T>) -> Result<StepResult, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler) in handlers.iter().enumerate() {
    let handler_span = span!(Level::DEBUG, "flow_handler", phase = phase_name, handler_index = handler_idx);
    match handler(ctx.clone()).instrument(handler_span).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Stop) => {
        event!(Level::INFO, phase = phase_name, "Flow stopped by a handler.");
        return Ok(StepResult::Stopped);
      }
      Err(e) => {
        event!(Level::ERROR, phase = phase_name, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(StepResult::Continue)
}
