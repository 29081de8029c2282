//! Stem separation: output validation, the external separation tool, and the
//! multi-model fallback engine.

mod fallback;
mod probe;
mod tool;
mod validator;

pub use fallback::{SeparationEngine, SeparationOutcome};
pub use probe::{AudioProbe, AudioStats, SymphoniaProbe};
pub use tool::{DemucsTool, SeparationTool, ToolError, ToolRun};
pub use validator::{StemProblem, StemValidator, ValidationResult, ValidatorSettings, EXPECTED_STEMS};
