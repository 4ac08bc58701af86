//! Stores de trials: contrato y backend en memoria.

mod memory;
mod types;

pub use memory::InMemoryTrialStore;
pub use types::{SubmissionOutcome, TrialStore};
