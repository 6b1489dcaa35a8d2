//! Orchestration layer for SGC cohort file intake.
//!
//! [`CohortService`] ties the pipeline together: uploads are parsed,
//! validated, gated against the cohort's declared sample sizes, and only
//! then persisted; any file mutation resets the cohort's validation status;
//! and `validate_cohort` regenerates the derived "both" files before running
//! the cross-file consistency checks fail-fast.

mod error;
mod service;

pub use error::{IntakeError, Result};
pub use service::{CohortService, UploadReceipt, ValidationRun};
