mod context;
mod form;
mod stage;

pub use context::WorkflowContext;
pub use form::{FormWorkflow, Transition};
pub use stage::Stage;
