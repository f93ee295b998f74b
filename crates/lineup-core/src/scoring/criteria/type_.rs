/// Content type matching against block and profile preferences.
use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionResult, ScoringContext};

pub struct TypeCriterion;

impl TypeCriterion {
    fn calculate(&self, content: &Content, profile: &Profile, block: Option<&TimeBlock>) -> f64 {
        let kind = content.kind;

        if let Some(block) = block {
            let criteria = &block.criteria;
            if kind.is_in(&criteria.excluded_types) {
                return 0.0;
            }
            if !criteria.preferred_types.is_empty() && kind.is_in(&criteria.preferred_types) {
                return 100.0;
            }
            if !criteria.allowed_types.is_empty() && kind.is_in(&criteria.allowed_types) {
                return 75.0;
            }
        }

        let global = &profile.mandatory_forbidden_criteria;
        if kind.is_in(&global.forbidden_types) {
            return 0.0;
        }
        if !global.allowed_types.is_empty() && !kind.is_in(&global.allowed_types) {
            return 25.0;
        }

        75.0
    }
}

impl Criterion for TypeCriterion {
    fn name(&self) -> &'static str {
        "type"
    }

    fn default_weight(&self) -> f64 {
        20.0
    }

    fn evaluate(
        &self,
        content: &Content,
        _meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        _ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let mut score = self.calculate(content, profile, block);
        let policy = policy_of(profile, block);

        // Type is a single token: membership semantics against the rule lists
        let (adjustment, violation) = mfp::check_single_token(
            content.kind.as_str(),
            block_rules(block, self.name()),
            &policy,
        );
        score += adjustment;

        CriterionResult::build(
            self.name(),
            score,
            weight_of(profile, self),
            multiplier_of(profile, block, self.name()),
        )
        .with_rule_violation(violation)
    }
}

// ============================================================================
// TESTS
// ============================================================================
