mod mapping;
pub mod prompt;
mod synthesizer;
pub mod tools;
pub mod transitions;
pub mod types;
pub mod validate;

pub use synthesizer::{QuerySynthesizer, SchemaInputs};
pub use tools::SchemaTools;
pub use transitions::{PhaseTracker, PhaseTransition, SynthesisPhase, TransitionError};
pub use types::{
    ExecutedQuery, ExecutionMetadata, FieldMapping, MappingOutcome, PlanOutcome, QueryPlan,
    QueryRequest, Rejection, SynthesisOutcome, ValidatedPlan, MAX_RATIONALE_CHARS,
};
pub use validate::{QueryValidator, ValidationResult};
