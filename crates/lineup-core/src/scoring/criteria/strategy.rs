/// Programming strategy compliance: sequence, variety, marathon and filler
/// insertion flags, plus optional rules over content characteristics.
use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentKind, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, lowered, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionResult, ScoringContext};

pub struct StrategyCriterion;

/// Characteristic tokens a content item exhibits: `filler` when its kind is
/// one of the configured filler types, `variety` with two or more genres,
/// `marathon` when it belongs to a collection, plus the kind itself.
pub fn content_characteristics(
    content: &Content,
    meta: Option<&ContentMeta>,
    profile: &Profile,
) -> Vec<String> {
    let mut characteristics = Vec::new();

    let filler_types = lowered(&profile.strategies.filler_insertion.filler_types());
    if filler_types.contains(&content.kind.as_str().to_string()) {
        characteristics.push("filler".to_string());
    }

    if let Some(meta) = meta {
        if meta.genres.len() >= 2 {
            characteristics.push("variety".to_string());
        }
        if !meta.collections.is_empty() {
            characteristics.push("marathon".to_string());
        }
    }

    characteristics.push(content.kind.as_str().to_string());
    characteristics
}

impl StrategyCriterion {
    fn calculate(&self, content: &Content, meta: Option<&ContentMeta>, profile: &Profile) -> f64 {
        let strategies = &profile.strategies;
        let has_any = strategies.maintain_sequence
            || strategies.maximize_variety
            || strategies.marathon_mode
            || strategies.filler_insertion.enabled;
        if !has_any {
            return 80.0;
        }

        let mut score: f64 = 100.0;

        if strategies.maintain_sequence && content.kind != ContentKind::Episode {
            score -= 5.0;
        }

        if strategies.maximize_variety {
            if let Some(meta) = meta {
                if meta.genres.len() > 2 {
                    score += 5.0;
                }
            }
        }

        if strategies.marathon_mode {
            if let Some(meta) = meta {
                if !meta.collections.is_empty() {
                    score += 10.0;
                }
            }
        }

        if strategies.filler_insertion.enabled {
            let filler_types = lowered(&strategies.filler_insertion.filler_types());
            if filler_types.contains(&content.kind.as_str().to_string()) {
                score += 5.0;
            }
        }

        score.clamp(0.0, 100.0)
    }
}

impl Criterion for StrategyCriterion {
    fn name(&self) -> &'static str {
        "strategy"
    }

    fn default_weight(&self) -> f64 {
        20.0
    }

    fn evaluate(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        _ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let mut score = self.calculate(content, meta, profile);

        let mut violation = None;
        if let Some(rules) = block_rules(block, self.name()) {
            let policy = policy_of(profile, block);
            let characteristics = content_characteristics(content, meta, profile);
            let (adjustment, outcome) = mfp::check_rules(&characteristics, Some(rules), &policy);
            score += adjustment;
            violation = outcome;
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockCriteria, CriterionRules};
    use crate::testing::fixtures::{
        block_with_criteria, meta_with_genres, movie, profile_with_block,
    };

    #[test]
    fn test_no_strategies_neutral() {
        let profile = Profile::default();
        let result = StrategyCriterion.evaluate(&movie("m", "Heat", 170), None, &profile, None, None);
        assert_eq!(result.score, 80.0);
    }

    #[test]
    fn test_sequence_mode_penalizes_non_episodes() {
        let mut profile = Profile::default();
        profile.strategies.maintain_sequence = true;

        let result = StrategyCriterion.evaluate(&movie("m", "Heat", 170), None, &profile, None, None);
        assert_eq!(result.score, 95.0);
    }

    #[test]
    fn test_marathon_mode_rewards_collections() {
        let mut profile = Profile::default();
        profile.strategies.marathon_mode = true;

        let mut meta = meta_with_genres(&["action"]);
        meta.collections = vec!["John Wick Collection".to_string()];

        let result =
            StrategyCriterion.evaluate(&movie("m", "JW4", 160), Some(&meta), &profile, None, None);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_characteristics_tokens() {
        let mut profile = Profile::default();
        profile.strategies.filler_insertion.enabled = true;

        let mut meta = meta_with_genres(&["action", "thriller"]);
        meta.collections = vec!["A Collection".to_string()];

        let tokens = content_characteristics(&movie("m", "Heat", 170), Some(&meta), &profile);
        assert!(tokens.contains(&"variety".to_string()));
        assert!(tokens.contains(&"marathon".to_string()));
        assert!(tokens.contains(&"movie".to_string()));
        assert!(!tokens.contains(&"filler".to_string()));
    }

    #[test]
    fn test_strategy_rules_forbid_filler() {
        let block = block_with_criteria(
            "prime",
            "20:00",
            "23:00",
            BlockCriteria {
                strategy_rules: Some(CriterionRules {
                    forbidden_values: vec!["filler".to_string()],
                    ..CriterionRules::default()
                }),
                ..BlockCriteria::default()
            },
        );
        let mut profile = profile_with_block(&block);
        profile.strategies.filler_insertion.enabled = true;

        let mut trailer = movie("t", "Teaser", 2);
        trailer.kind = ContentKind::Trailer;

        let result =
            StrategyCriterion.evaluate(&trailer, None, &profile, Some(&block), None);
        assert_eq!(result.score, 0.0);
        assert!(result.rule_violation.unwrap().is_forbidden());
    }
}
