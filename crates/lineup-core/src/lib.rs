pub mod blocks;
pub mod domain;
pub mod export;
pub mod generator;
pub mod jobs;
pub mod ports;
pub mod scoring;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use domain::{
    BlockCriteria, CacheMode, Content, ContentItem, ContentKind, ContentMeta, CriterionRules,
    DomainError, EnhancedCriteria, GlobalCriteria, MfpPolicy, Profile, ProgrammingRequest,
    ProgrammingResult, ReplacementReason, ScheduledProgram, ScoringWeights, Strategies,
    TimeBlockConfig,
};

pub use blocks::{BlockSlot, TimeBlock, TimeBlockSchedule};

pub use scoring::{
    CriterionDetails, CriterionResult, ForbiddenViolation, KeywordMatch, MandatoryPenalty,
    RuleKind, RuleOutcome, ScoringContext, ScoringEngine, ScoringResult, TimingDetails,
};

pub use generator::{
    CancelToken, GenerationParams, Generator, ProgressCallback, ProgressUpdate, ScoredPlaylist,
};

pub use jobs::{
    Job, JobCoordinator, JobEvent, JobKind, JobStatus, ProgressFields, ProgressStep, StepStatus,
};

pub use ports::{
    ChannelRef, ChannelSink, ContentCatalog, InMemoryCatalog, MetadataProvider, SuggestionModel,
};

pub use export::scoring_csv;
