pub mod audit;
pub mod batch;
pub mod corrector;
pub mod filename;
pub mod strict;

pub use audit::{AuditLog, CorrectionRecord};
pub use batch::{run_batch, BatchOptions, BatchSummary};
pub use corrector::{CorrectionMap, Corrector, ResolvedTag, ValidationOutcome, SENTINEL};
pub use strict::{check, CheckReport, HeaderSets};
