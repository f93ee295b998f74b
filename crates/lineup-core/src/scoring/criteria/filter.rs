/// Keyword and studio filters over title, metadata keywords and studios.
/// Keyword matching is substring-based; studios match exactly.
use std::collections::BTreeSet;

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, lowered, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionResult, ScoringContext};

pub struct FilterCriterion;

struct Filters {
    forbidden_keywords: Vec<String>,
    preferred_keywords: Vec<String>,
    forbidden_studios: BTreeSet<String>,
    preferred_studios: BTreeSet<String>,
}

fn filters_for(profile: &Profile, block: Option<&TimeBlock>) -> Filters {
    match block {
        Some(block) => {
            let criteria = &block.criteria;
            let mut forbidden_keywords = lowered(&criteria.forbidden_keywords);
            let mut preferred_keywords = lowered(&criteria.preferred_keywords);
            // filter_rules values fold into the keyword lists
            if let Some(rules) = &criteria.filter_rules {
                forbidden_keywords.extend(lowered(&rules.forbidden_values));
                preferred_keywords.extend(lowered(&rules.preferred_values));
            }
            Filters {
                forbidden_keywords,
                preferred_keywords,
                forbidden_studios: lowered(&criteria.forbidden_studios).into_iter().collect(),
                preferred_studios: lowered(&criteria.preferred_studios).into_iter().collect(),
            }
        }
        None => {
            let global = &profile.mandatory_forbidden_criteria;
            Filters {
                forbidden_keywords: lowered(&global.forbidden_keywords),
                preferred_keywords: lowered(&global.preferred_keywords),
                forbidden_studios: lowered(&global.forbidden_studios).into_iter().collect(),
                preferred_studios: lowered(&global.preferred_studios).into_iter().collect(),
            }
        }
    }
}

impl FilterCriterion {
    fn calculate(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
    ) -> f64 {
        let Some(meta) = meta else {
            return 50.0;
        };

        let content_keywords = lowered(&meta.keywords);
        let content_studios: BTreeSet<String> = lowered(&meta.studios).into_iter().collect();
        let title = content.title.to_lowercase();

        let filters = filters_for(profile, block);

        // Forbidden matches zero out immediately
        for forbidden in &filters.forbidden_keywords {
            if content_keywords.iter().any(|kw| kw.contains(forbidden))
                || title.contains(forbidden)
            {
                return 0.0;
            }
        }
        if content_studios
            .intersection(&filters.forbidden_studios)
            .next()
            .is_some()
        {
            return 0.0;
        }

        let mut score = 50.0;

        // Preferred keyword bonuses stack: +5 per hit, capped at 50
        if !filters.preferred_keywords.is_empty() {
            let mut matched_count = 0usize;
            let mut matched_preferred: BTreeSet<&String> = BTreeSet::new();

            for content_kw in &content_keywords {
                for preferred in &filters.preferred_keywords {
                    if content_kw.contains(preferred) {
                        matched_count += 1;
                        matched_preferred.insert(preferred);
                        break;
                    }
                }
            }
            for preferred in &filters.preferred_keywords {
                if !matched_preferred.contains(preferred) && title.contains(preferred) {
                    matched_count += 1;
                }
            }

            if matched_count > 0 {
                score += (matched_count as f64 * 5.0).min(50.0);
            }
        }

        // Studio bonuses: +10 per hit, capped at 20
        let studio_matches = content_studios
            .intersection(&filters.preferred_studios)
            .count();
        if studio_matches > 0 {
            score += (studio_matches as f64 * 10.0).min(20.0);
        }

        score.min(100.0)
    }
}

impl Criterion for FilterCriterion {
    fn name(&self) -> &'static str {
        "filter"
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
        let score = self.calculate(content, meta, profile, block);

        // filter_rules already shaped the score above; the rule check here is
        // for outcome reporting only
        let mut violation = None;
        if let (Some(meta), Some(rules)) = (meta, block_rules(block, self.name())) {
            let policy = policy_of(profile, block);
            let mut values: Vec<String> = meta.keywords.clone();
            values.extend(meta.studios.clone());
            values.extend(content.title.split_whitespace().map(|w| w.to_string()));
            let (_, outcome) = mfp::check_rules(&values, Some(rules), &policy);
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
    use crate::domain::BlockCriteria;
    use crate::testing::fixtures::{block_with_criteria, meta_with_genres, movie, profile_with_block};

    fn keyworded(keywords: &[&str], studios: &[&str]) -> ContentMeta {
        let mut meta = meta_with_genres(&["action"]);
        meta.keywords = keywords.iter().map(|k| k.to_string()).collect();
        meta.studios = studios.iter().map(|s| s.to_string()).collect();
        meta
    }

    fn filter_block(
        forbidden_kw: &[&str],
        preferred_kw: &[&str],
        preferred_studios: &[&str],
    ) -> TimeBlock {
        block_with_criteria(
            "b",
            "00:00",
            "23:59",
            BlockCriteria {
                forbidden_keywords: forbidden_kw.iter().map(|s| s.to_string()).collect(),
                preferred_keywords: preferred_kw.iter().map(|s| s.to_string()).collect(),
                preferred_studios: preferred_studios.iter().map(|s| s.to_string()).collect(),
                ..BlockCriteria::default()
            },
        )
    }

    #[test]
    fn test_forbidden_keyword_substring_zeroes() {
        let block = filter_block(&["superhero"], &[], &[]);
        let profile = profile_with_block(&block);
        let meta = keyworded(&["superhero team"], &[]);

        let result = FilterCriterion.evaluate(
            &movie("m", "Cape Film", 130),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_forbidden_keyword_in_title_zeroes() {
        let block = filter_block(&["reboot"], &[], &[]);
        let profile = profile_with_block(&block);
        let meta = keyworded(&[], &[]);

        let result = FilterCriterion.evaluate(
            &movie("m", "The Reboot Returns", 100),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_preferred_bonuses_stack() {
        let block = filter_block(&[], &["heist", "noir"], &["a24"]);
        let profile = profile_with_block(&block);
        let meta = keyworded(&["heist gone wrong", "neo noir"], &["A24"]);

        let result = FilterCriterion.evaluate(
            &movie("m", "Small Hours", 105),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        // 50 base + 2 keyword hits * 5 + 1 studio hit * 10
        assert_eq!(result.score, 70.0);
    }

    #[test]
    fn test_neutral_without_matches_or_metadata() {
        let block = filter_block(&["war"], &["heist"], &[]);
        let profile = profile_with_block(&block);
        let meta = keyworded(&["romance"], &[]);

        let result = FilterCriterion.evaluate(
            &movie("m", "Plain", 95),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 50.0);

        let result =
            FilterCriterion.evaluate(&movie("m", "Plain", 95), None, &profile, Some(&block), None);
        assert_eq!(result.score, 50.0);
    }
}
