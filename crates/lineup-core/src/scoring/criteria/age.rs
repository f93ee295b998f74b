/// Age rating compliance.
///
/// Ratings from different certification systems are normalized (country
/// prefixes stripped, lowercased) and mapped onto a 0-4 restriction level.
/// Content exceeding the block's `max_age_rating` scores zero and emits a
/// synthetic forbidden outcome the engine escalates to a schedule-level
/// violation.
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionResult, RuleKind, RuleOutcome, ScoringContext};

pub struct AgeCriterion;

/// Restriction levels: 0 all ages, 1 guidance, 2 teen, 3 restricted,
/// 4 adults only.
static AGE_RATINGS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        // US/MPAA
        ("g", 0),
        ("pg", 1),
        ("pg-13", 2),
        ("r", 3),
        ("nc-17", 4),
        // US TV
        ("tv-g", 0),
        ("tv-y", 0),
        ("tv-y7", 0),
        ("tv-pg", 1),
        ("tv-14", 2),
        ("tv-ma", 3),
        // French CSA
        ("tp", 0),
        ("tous publics", 0),
        ("u", 0),
        ("-10", 1),
        ("+10", 1),
        ("10+", 1),
        ("10", 1),
        ("-12", 2),
        ("+12", 2),
        ("12+", 2),
        ("12", 2),
        ("-16", 3),
        ("+16", 3),
        ("16+", 3),
        ("16", 3),
        ("-18", 4),
        ("+18", 4),
        ("18+", 4),
        ("18", 4),
        // UK BBFC
        ("uc", 0),
        ("12a", 2),
        ("15", 3),
        // German FSK
        ("fsk 0", 0),
        ("fsk 6", 1),
        ("fsk 12", 2),
        ("fsk 16", 3),
        ("fsk 18", 4),
        ("fsk0", 0),
        ("fsk6", 1),
        ("fsk12", 2),
        ("fsk16", 3),
        ("fsk18", 4),
        // Common variations
        ("nr", 2),
        ("unrated", 2),
        ("not rated", 2),
    ])
});

/// Strip country/system prefixes ("fr/U", "mpaa:PG-13") and lowercase.
pub fn normalize_rating(rating: &str) -> String {
    let mut rating = rating.trim().to_lowercase();
    if let Some(idx) = rating.rfind('/') {
        rating = rating[idx + 1..].trim().to_string();
    }
    if let Some(idx) = rating.rfind(':') {
        rating = rating[idx + 1..].trim().to_string();
    }
    rating
}

/// Restriction level for a rating. Unknown ratings fall back to the teen
/// level (2) after trying to parse an embedded age.
pub fn rating_level(rating: &str) -> u8 {
    let normalized = normalize_rating(rating);
    if let Some(level) = AGE_RATINGS.get(normalized.as_str()) {
        return *level;
    }

    // Numeric fallback: the first standalone 1-2 digit number read as an age
    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in normalized.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    if let Some(age) = runs
        .iter()
        .find(|run| run.len() <= 2)
        .and_then(|run| run.parse::<u8>().ok())
    {
        return match age {
            0..=6 => 0,
            7..=10 => 1,
            11..=13 => 2,
            14..=16 => 3,
            _ => 4,
        };
    }

    2
}

fn level_name(level: u8) -> &'static str {
    match level {
        0 => "G",
        1 => "PG",
        3 => "R",
        4 => "NC-17",
        _ => "PG-13",
    }
}

fn max_rating_for<'a>(profile: &'a Profile, block: Option<&'a TimeBlock>) -> Option<&'a str> {
    block
        .and_then(|b| b.criteria.max_age_rating.as_deref())
        .or(profile.mandatory_forbidden_criteria.max_age_rating.as_deref())
}

impl AgeCriterion {
    fn calculate(&self, meta: Option<&ContentMeta>, profile: &Profile, block: Option<&TimeBlock>) -> f64 {
        let Some(rating) = meta.and_then(|m| m.age_rating.as_deref()).filter(|r| !r.is_empty())
        else {
            return 75.0;
        };
        let Some(max_rating) = max_rating_for(profile, block) else {
            return 80.0;
        };

        let content_level = rating_level(rating);
        let max_level = rating_level(max_rating);

        if content_level < max_level {
            100.0
        } else if content_level == max_level {
            90.0
        } else {
            0.0
        }
    }
}

impl Criterion for AgeCriterion {
    fn name(&self) -> &'static str {
        "age"
    }

    fn default_weight(&self) -> f64 {
        20.0
    }

    fn evaluate(
        &self,
        _content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        _ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let mut score = self.calculate(meta, profile, block);
        let mut violation = None;

        let content_rating = meta
            .and_then(|m| m.age_rating.as_deref())
            .filter(|r| !r.is_empty());

        // Exceeding the ceiling is a forbidden violation, not just a bad score
        if let (Some(rating), Some(max_rating)) = (content_rating, max_rating_for(profile, block)) {
            if rating_level(rating) > rating_level(max_rating) {
                violation = Some(RuleOutcome::new(
                    RuleKind::Forbidden,
                    vec![rating.to_string()],
                    -200.0,
                ));
                score = 0.0;
            }
        }

        // Additional age_rules, matched on the raw rating, its normalized
        // form, and the level name
        if violation.is_none() {
            if let (Some(rating), Some(rules)) = (content_rating, block_rules(block, self.name())) {
                let policy = policy_of(profile, block);
                let normalized = normalize_rating(rating);
                let mut tokens = vec![rating.to_string()];
                if normalized != rating.to_lowercase() {
                    tokens.push(normalized);
                }
                tokens.push(level_name(rating_level(rating)).to_string());

                let (adjustment, outcome) = mfp::check_alias_tokens(&tokens, Some(rules), &policy);
                score += adjustment;
                violation = outcome;
            }
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
    use rstest::rstest;

    #[rstest]
    #[case("fr/U", "u")]
    #[case("us/PG-13", "pg-13")]
    #[case("mpaa:PG-13", "pg-13")]
    #[case("Tous publics", "tous publics")]
    #[case("+16", "+16")]
    fn test_normalize_rating(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_rating(raw), expected);
    }

    #[rstest]
    #[case("G", 0)]
    #[case("fr/U", 0)]
    #[case("TP", 0)]
    #[case("PG", 1)]
    #[case("FSK 6", 1)]
    #[case("PG-13", 2)]
    #[case("12A", 2)]
    #[case("R", 3)]
    #[case("+16", 3)]
    #[case("NC-17", 4)]
    #[case("FSK 18", 4)]
    #[case("rated 16", 3)]
    #[case("completely unknown", 2)]
    fn test_rating_levels(#[case] rating: &str, #[case] level: u8) {
        assert_eq!(rating_level(rating), level);
    }

    fn rated_meta(rating: &str) -> ContentMeta {
        let mut meta = meta_with_genres(&["drama"]);
        meta.age_rating = Some(rating.to_string());
        meta
    }

    fn capped_block(max: &str) -> TimeBlock {
        block_with_criteria(
            "kids",
            "07:00",
            "10:00",
            BlockCriteria {
                max_age_rating: Some(max.to_string()),
                ..BlockCriteria::default()
            },
        )
    }

    #[test]
    fn test_below_ceiling_scores_100_at_ceiling_90() {
        let block = capped_block("PG-13");
        let profile = profile_with_block(&block);

        let result = AgeCriterion.evaluate(
            &movie("m", "Soft", 90),
            Some(&rated_meta("G")),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 100.0);

        let result = AgeCriterion.evaluate(
            &movie("m", "Teen", 90),
            Some(&rated_meta("PG-13")),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 90.0);
    }

    #[test]
    fn test_exceeding_ceiling_is_forbidden() {
        let block = capped_block("PG");
        let profile = profile_with_block(&block);

        let result = AgeCriterion.evaluate(
            &movie("m", "Hard", 110),
            Some(&rated_meta("R")),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 0.0);
        let violation = result.rule_violation.unwrap();
        assert_eq!(violation.rule_type, RuleKind::Forbidden);
        assert_eq!(violation.values, vec!["R".to_string()]);
    }

    #[test]
    fn test_missing_rating_is_neutral() {
        let block = capped_block("PG");
        let profile = profile_with_block(&block);

        let result = AgeCriterion.evaluate(
            &movie("m", "Unknown", 90),
            Some(&meta_with_genres(&["drama"])),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 75.0);
        assert!(result.rule_violation.is_none());
    }
}
