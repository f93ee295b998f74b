pub mod criteria;
pub mod engine;
pub mod mfp;
pub mod types;

pub use engine::ScoringEngine;
pub use types::{
    BonusDetails, CriterionDetails, CriterionResult, ForbiddenViolation, KeywordMatch,
    MandatoryPenalty, RuleKind, RuleOutcome, ScoringContext, ScoringResult, TimingDetails,
};
