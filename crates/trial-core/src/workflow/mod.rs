//! Workflow: política de admisión y máquina de estados del trial.

mod machine;
mod policy;

pub use machine::{all_steps_approved, WorkflowMachine};
pub use policy::WorkflowPolicy;
