//! Async request workflows built from named, ordered steps.

pub mod context;
pub mod control;
pub mod definition;
pub mod execution;
pub mod registry;
pub mod step;

pub use context::FlowContext;
pub use control::{FlowControl, FlowOutcome};
pub use definition::Flow;
pub use registry::FlowRegistry;
pub use step::{Handler, SkipCondition, StepDef};
