/// The nine scoring criteria.
///
/// Each criterion is a pure evaluation from `(content, meta, profile, block,
/// context)` to a `CriterionResult`. Registration is a static list owned by
/// the engine; there is no inheritance, only this trait.
pub mod age;
pub mod bonus;
pub mod duration;
pub mod filter;
pub mod genre;
pub mod rating;
pub mod strategy;
pub mod timing;
pub mod type_;

pub use age::AgeCriterion;
pub use bonus::BonusCriterion;
pub use duration::DurationCriterion;
pub use filter::FilterCriterion;
pub use genre::GenreCriterion;
pub use rating::RatingCriterion;
pub use strategy::StrategyCriterion;
pub use timing::TimingCriterion;
pub use type_::TypeCriterion;

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, CriterionRules, MfpPolicy, Profile};
use crate::scoring::{CriterionResult, ScoringContext};

/// One scoring rule producing a 0-100 sub-score.
pub trait Criterion: Send + Sync {
    /// Criterion name; also the key into `scoring_weights` and
    /// `criterion_multipliers`.
    fn name(&self) -> &'static str;

    fn default_weight(&self) -> f64;

    fn evaluate(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        ctx: Option<&ScoringContext>,
    ) -> CriterionResult;
}

/// Effective weight for a criterion from the profile.
pub(crate) fn weight_of(profile: &Profile, criterion: &dyn Criterion) -> f64 {
    profile
        .scoring_weights
        .get(criterion.name(), criterion.default_weight())
}

/// Effective multiplier: block-level overrides profile-level.
pub(crate) fn multiplier_of(profile: &Profile, block: Option<&TimeBlock>, name: &str) -> f64 {
    profile.multiplier_for(name, block.map(|b| &b.criteria.criterion_multipliers))
}

/// Effective M/F/P policy: block-level overrides profile-level.
pub(crate) fn policy_of(profile: &Profile, block: Option<&TimeBlock>) -> MfpPolicy {
    profile.mfp_policy_for(block.and_then(|b| b.criteria.mfp_policy.as_ref()))
}

/// Block-level rule set for a criterion, if any.
pub(crate) fn block_rules<'a>(block: Option<&'a TimeBlock>, name: &str) -> Option<&'a CriterionRules> {
    block.and_then(|b| b.criteria.rules_for(name))
}

/// Lowercase a string list for case-insensitive matching.
pub(crate) fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}
