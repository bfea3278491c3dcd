// vitrine/src/flow/registry.rs

//! `FlowRegistry<E>`: one flow per context type, dispatched by `TypeId`.

use crate::error::FlowError;
use crate::flow::context::FlowContext;
use crate::flow::control::FlowOutcome;
use crate::flow::definition::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedFlow<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx` must hold the `FlowContext<T>` the wrapped flow was built for.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct RegisteredFlow<T, FlowErr, AppErr>
where
  T: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<T, FlowErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, FlowErr, AppErr> ErasedFlow<AppErr> for RegisteredFlow<T, FlowErr, AppErr>
where
  T: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<FlowErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let typed_ctx = match ctx.downcast::<FlowContext<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected = std::any::type_name::<FlowContext<T>>();
        event!(Level::ERROR, expected, "Context type mismatch at registry dispatch.");
        return Err(AppErr::from(FlowError::Internal(format!(
          "registry dispatch expected {}",
          expected
        ))));
      }
    };
    self.flow.run(typed_ctx).await.map_err(AppErr::from)
  }
}

/// Holds the application's flows and runs the one matching a context's type.
///
/// `AppErr` is what `run` returns; it must absorb both the engine's
/// `FlowError` and each registered flow's handler error.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<AppErr>>>>,
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for its context type, replacing any earlier flow for that type.
  pub fn register<T, FlowErr>(&self, flow: Flow<T, FlowErr>)
  where
    T: 'static + Send + Sync,
    FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<FlowErr>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<T>(), steps = ?flow.step_names(), "Registering flow.");
    let registered = RegisteredFlow::<T, FlowErr, AppErr> {
      flow: Arc::new(flow),
      _app_err: PhantomData,
    };
    self.flows.write().insert(TypeId::of::<T>(), Arc::new(registered));
  }

  pub fn contains<T: 'static>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.flows.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.flows.read().is_empty()
  }

  /// Runs the flow registered for `T`.
  #[instrument(name = "FlowRegistry::run", skip_all, fields(context_type = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = self.flows.read().get(&TypeId::of::<T>()).cloned();
    let runner = runner.ok_or_else(|| {
      let type_name = std::any::type_name::<T>();
      event!(Level::ERROR, "No flow registered for context type {}.", type_name);
      AppErr::from(FlowError::Configuration {
        scope: "FlowRegistry::run".to_string(),
        message: format!("no flow registered for context type {}", type_name),
      })
    })?;
    runner.run_erased(Box::new(ctx)).await
  }
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
