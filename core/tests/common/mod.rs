// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use tracing::Level;
use vitrine::{FlowContext, FlowControl, FlowError};

#[derive(Clone, Debug, Default)]
pub struct OrderContext {
  pub total_cents: i64,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub skip_discount: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AuditContext {
  pub entries: Vec<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow engine error: {0}")]
  Engine(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(e: FlowError) -> Self {
    TestError::Engine(e.to_string())
  }
}

/// A handler that records its step and adds `amount` to the total, stopping
/// if the context asks it to.
pub fn recording_handler(
  step_name: &'static str,
  amount: i64,
) -> impl Fn(FlowContext<OrderContext>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<FlowControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: FlowContext<OrderContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total_cents += amount;
      guard.trail.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, total = guard.total_cents, "handler ran");
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(FlowControl::Stop);
      }
      Ok(FlowControl::Continue)
    })
  }
}

pub fn failing_handler(
  step_name: &'static str,
  message: &'static str,
) -> impl Fn(FlowContext<OrderContext>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<FlowControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: FlowContext<OrderContext>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub const PNG_BYTES: &[u8] = &[
  0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01];
