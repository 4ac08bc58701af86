//! Modelo de datos: trials, registros de steps, códigos y veredictos.

mod codes;
mod state;
mod step_record;
mod trial;

pub use codes::{StepCode, Verdict};
pub use state::{TrialState, TrialStatus};
pub use step_record::{payload_from_value, StepPayload, StepRecord, StepSubmission};
pub use trial::{NewTrial, Trial, TrialDetail, TrialFilter, TrialStats, TrialSummary};
