// tests/flow_registry_tests.rs
mod common;

use common::*;
use vitrine::{Flow, FlowContext, FlowControl, FlowOutcome, FlowRegistry};

fn audit_flow() -> Flow<AuditContext, TestError> {
  let mut flow = Flow::new(&[("record", false, None)]);
  flow.on("record", |ctx: FlowContext<AuditContext>| async move {
    ctx.write().entries.push("recorded".to_string());
    Ok::<_, TestError>(FlowControl::Continue)
  });
  flow
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut order = Flow::<OrderContext, TestError>::new(&[("price", false, None)]);
  order.on("price", recording_handler("price", 500));
  registry.register(order);
  registry.register(audit_flow());

  assert_eq!(registry.len(), 2);
  assert!(registry.contains::<OrderContext>());
  assert!(registry.contains::<AuditContext>());

  let order_ctx = FlowContext::new(OrderContext::default());
  assert_eq!(registry.run(order_ctx.clone()).await, Ok(FlowOutcome::Completed));
  assert_eq!(order_ctx.read().total_cents, 500);

  let audit_ctx = FlowContext::new(AuditContext::default());
  registry.run(audit_ctx.clone()).await.unwrap();
  assert_eq!(audit_ctx.read().entries, vec!["recorded"]);
}

#[tokio::test]
async fn unregistered_context_is_a_configuration_error() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  assert!(registry.is_empty());

  let err = registry.run(FlowContext::new(AuditContext::default())).await.unwrap_err();
  assert!(matches!(err, TestError::Engine(msg) if msg.contains("no flow registered")));
}

#[tokio::test]
async fn later_registration_replaces_earlier_one() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut first = Flow::<OrderContext, TestError>::new(&[("price", false, None)]);
  first.on("price", recording_handler("first", 1));
  registry.register(first);

  let mut second = Flow::<OrderContext, TestError>::new(&[("price", false, None)]);
  second.on("price", recording_handler("second", 2));
  registry.register(second);

  let ctx = FlowContext::new(OrderContext::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(registry.len(), 1);
  assert_eq!(ctx.read().trail, vec!["second"]);
}

#[tokio::test]
async fn handler_errors_reach_the_caller() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  let mut flow = Flow::<OrderContext, TestError>::new(&[("price", false, None)]);
  flow.on("price", failing_handler("price", "no stock"));
  registry.register(flow);

  let err = registry.run(FlowContext::new(OrderContext::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("no stock".to_string()));
}
