/// Genre preference matching with unified mandatory/forbidden/preferred
/// semantics. Mandatory is set-inclusion: at least one mandatory genre must
/// be present, never "the content must carry the whole list".
use std::collections::BTreeSet;

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{CriterionResult, RuleKind, RuleOutcome, ScoringContext};

pub struct GenreCriterion;

/// The effective mandatory/forbidden/preferred genre sets for a slot,
/// merging the direct block lists with the block's `genre_rules` (or the
/// profile-level lists when no block applies). All lowercased.
struct GenreSets {
    mandatory: BTreeSet<String>,
    forbidden: BTreeSet<String>,
    preferred: BTreeSet<String>,
}

fn collect_sets(profile: &Profile, block: Option<&TimeBlock>) -> GenreSets {
    let to_set = |values: &[String]| -> BTreeSet<String> {
        values.iter().map(|v| v.to_lowercase()).collect()
    };

    match block {
        Some(block) => {
            let criteria = &block.criteria;
            let mut mandatory = to_set(&criteria.allowed_genres);
            let mut forbidden = to_set(&criteria.forbidden_genres);
            let mut preferred = to_set(&criteria.preferred_genres);
            if let Some(rules) = &criteria.genre_rules {
                mandatory.extend(rules.mandatory_values.iter().map(|v| v.to_lowercase()));
                forbidden.extend(rules.forbidden_values.iter().map(|v| v.to_lowercase()));
                preferred.extend(rules.preferred_values.iter().map(|v| v.to_lowercase()));
            }
            GenreSets {
                mandatory,
                forbidden,
                preferred,
            }
        }
        None => {
            let global = &profile.mandatory_forbidden_criteria;
            GenreSets {
                mandatory: to_set(&global.allowed_genres),
                forbidden: to_set(&global.forbidden_genres),
                preferred: to_set(&global.preferred_genres),
            }
        }
    }
}

impl Criterion for GenreCriterion {
    fn name(&self) -> &'static str {
        "genre"
    }

    fn default_weight(&self) -> f64 {
        25.0
    }

    fn evaluate(
        &self,
        _content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        _ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let weight = weight_of(profile, self);
        let multiplier = multiplier_of(profile, block, self.name());
        let policy = policy_of(profile, block);

        let content_genres: BTreeSet<String> = match meta {
            Some(meta) if !meta.genres.is_empty() => {
                meta.genres.iter().map(|g| g.to_lowercase()).collect()
            }
            // Absent metadata is neutral, never an error
            _ => {
                return CriterionResult::build(self.name(), 50.0, weight, multiplier);
            }
        };

        let sets = collect_sets(profile, block);

        let forbidden_hits: Vec<String> = content_genres
            .intersection(&sets.forbidden)
            .cloned()
            .collect();
        if !forbidden_hits.is_empty() {
            let outcome = RuleOutcome::new(
                RuleKind::Forbidden,
                forbidden_hits,
                policy.forbidden_detected_penalty,
            );
            return CriterionResult::build(self.name(), 0.0, weight, multiplier)
                .with_rule_violation(Some(outcome));
        }

        let mandatory_hits: Vec<String> = content_genres
            .intersection(&sets.mandatory)
            .cloned()
            .collect();

        let mut score;
        let mut violation = None;

        if !sets.mandatory.is_empty() {
            if mandatory_hits.is_empty() {
                // No mandatory genre present: very low base, still lets the
                // other criteria shape the total
                score = 10.0;
                violation = Some(RuleOutcome::new(
                    RuleKind::Mandatory,
                    sets.mandatory.iter().cloned().collect(),
                    policy.mandatory_missed_penalty,
                ));
            } else {
                score = 85.0;
                violation = Some(RuleOutcome::new(
                    RuleKind::Mandatory,
                    mandatory_hits.clone(),
                    policy.mandatory_matched_bonus,
                ));
            }
        } else {
            score = 75.0;
        }

        let preferred_hits: Vec<String> = content_genres
            .intersection(&sets.preferred)
            .cloned()
            .collect();
        if !preferred_hits.is_empty() {
            score += (preferred_hits.len() as f64 * 5.0).min(15.0);
            if violation.is_none() {
                violation = Some(RuleOutcome::new(
                    RuleKind::Preferred,
                    preferred_hits,
                    policy.preferred_matched_bonus,
                ));
            }
        }

        if mandatory_hits.len() > 1 {
            score += ((mandatory_hits.len() - 1) as f64 * 3.0).min(10.0);
        }

        CriterionResult::build(self.name(), score, weight, multiplier)
            .with_rule_violation(violation)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockCriteria;
    use crate::testing::fixtures::{
        block_with_criteria, meta_with_genres, movie, profile_with_block,
    };

    fn genre_block(allowed: &[&str], preferred: &[&str], forbidden: &[&str]) -> TimeBlock {
        block_with_criteria(
            "b",
            "00:00",
            "23:59",
            BlockCriteria {
                allowed_genres: allowed.iter().map(|s| s.to_string()).collect(),
                preferred_genres: preferred.iter().map(|s| s.to_string()).collect(),
                forbidden_genres: forbidden.iter().map(|s| s.to_string()).collect(),
                ..BlockCriteria::default()
            },
        )
    }

    #[test]
    fn test_forbidden_genre_zeroes_with_outcome() {
        let block = genre_block(&[], &[], &["horror"]);
        let profile = profile_with_block(&block);
        let meta = meta_with_genres(&["Horror", "Thriller"]);

        let result = GenreCriterion.evaluate(
            &movie("m", "Scary", 90),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 0.0);
        let violation = result.rule_violation.unwrap();
        assert_eq!(violation.rule_type, RuleKind::Forbidden);
        assert_eq!(violation.delta, -400.0);
    }

    #[test]
    fn test_mandatory_is_set_inclusion_not_containment() {
        // One matching mandatory genre is enough
        let block = genre_block(&["drama", "crime"], &[], &[]);
        let profile = profile_with_block(&block);
        let meta = meta_with_genres(&["Drama"]);

        let result = GenreCriterion.evaluate(
            &movie("m", "Heat", 170),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 85.0);
        assert_eq!(result.rule_violation.unwrap().delta, 10.0);
    }

    #[test]
    fn test_mandatory_missed_drops_to_10() {
        let block = genre_block(&["comedy"], &[], &[]);
        let profile = profile_with_block(&block);
        let meta = meta_with_genres(&["Drama"]);

        let result = GenreCriterion.evaluate(
            &movie("m", "Heat", 170),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 10.0);
        let violation = result.rule_violation.unwrap();
        assert_eq!(violation.rule_type, RuleKind::Mandatory);
        assert_eq!(violation.delta, -40.0);
    }

    #[test]
    fn test_preferred_bonus_caps_at_15() {
        let block = genre_block(&[], &["drama", "crime", "thriller", "action"], &[]);
        let profile = profile_with_block(&block);
        let meta = meta_with_genres(&["drama", "crime", "thriller", "action"]);

        let result = GenreCriterion.evaluate(
            &movie("m", "Busy", 120),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        // 75 base + min(15, 4*5)
        assert_eq!(result.score, 90.0);
    }

    #[test]
    fn test_multiple_mandatory_matches_extra_bonus() {
        let block = genre_block(&["drama", "crime", "thriller"], &[], &[]);
        let profile = profile_with_block(&block);
        let meta = meta_with_genres(&["drama", "crime", "thriller"]);

        let result = GenreCriterion.evaluate(
            &movie("m", "Heat", 170),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        // 85 base + min(10, (3-1)*3)
        assert_eq!(result.score, 91.0);
    }

    #[test]
    fn test_missing_metadata_is_neutral() {
        let block = genre_block(&["drama"], &[], &[]);
        let profile = profile_with_block(&block);

        let result =
            GenreCriterion.evaluate(&movie("m", "Heat", 170), None, &profile, Some(&block), None);
        assert_eq!(result.score, 50.0);
        assert!(result.rule_violation.is_none());
    }
}
