/// Community rating thresholds with a vote-count confidence penalty.
use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionResult, ScoringContext};

pub struct RatingCriterion;

/// Category token for a 0-10 rating, shared with the pre-filter.
pub fn rating_category(rating: Option<f64>) -> Option<&'static str> {
    let rating = rating?;
    Some(if rating >= 8.0 {
        "excellent"
    } else if rating >= 7.0 {
        "good"
    } else if rating >= 5.0 {
        "average"
    } else {
        "poor"
    })
}

struct Thresholds {
    min_rating: f64,
    preferred_rating: f64,
    min_votes: u32,
}

fn thresholds_for(profile: &Profile, block: Option<&TimeBlock>) -> Thresholds {
    match block {
        Some(block) => Thresholds {
            min_rating: block.criteria.min_tmdb_rating.unwrap_or(0.0),
            preferred_rating: block.criteria.preferred_tmdb_rating.unwrap_or(7.0),
            min_votes: block.criteria.min_vote_count.unwrap_or(0),
        },
        None => {
            let global = &profile.mandatory_forbidden_criteria;
            Thresholds {
                min_rating: global.min_tmdb_rating.unwrap_or(0.0),
                preferred_rating: global.preferred_tmdb_rating.unwrap_or(7.0),
                min_votes: global.min_vote_count.unwrap_or(0),
            }
        }
    }
}

impl RatingCriterion {
    fn calculate(&self, meta: Option<&ContentMeta>, profile: &Profile, block: Option<&TimeBlock>) -> f64 {
        let Some(meta) = meta else {
            return 50.0;
        };
        let Some(rating) = meta.rating else {
            return 50.0;
        };

        let thresholds = thresholds_for(profile, block);

        // Thin vote counts reduce confidence in the rating, up to -30
        let confidence_penalty = if thresholds.min_votes > 0 && meta.vote_count < thresholds.min_votes
        {
            let missing = (thresholds.min_votes - meta.vote_count) as f64;
            (missing / thresholds.min_votes as f64 * 30.0).min(30.0)
        } else {
            0.0
        };

        if rating < thresholds.min_rating {
            let ratio = rating / thresholds.min_rating.max(1.0);
            return (ratio * 40.0 - confidence_penalty).max(0.0);
        }

        if rating >= thresholds.preferred_rating {
            return (100.0 - confidence_penalty).max(70.0);
        }

        let range = thresholds.preferred_rating - thresholds.min_rating;
        if range > 0.0 {
            let position = (rating - thresholds.min_rating) / range;
            (50.0 + position * 40.0 - confidence_penalty).max(0.0)
        } else {
            60.0 - confidence_penalty
        }
    }
}

impl Criterion for RatingCriterion {
    fn name(&self) -> &'static str {
        "rating"
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

        // Rating rules operate on the single derived category token
        let mut violation = None;
        if let Some(category) = meta.and_then(|m| rating_category(m.rating)) {
            let policy = policy_of(profile, block);
            let (adjustment, outcome) =
                mfp::check_single_token(category, block_rules(block, self.name()), &policy);
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
    use crate::domain::BlockCriteria;
    use crate::testing::fixtures::{block_with_criteria, meta_with_genres, movie, profile_with_block};

    fn rated(rating: f64, votes: u32) -> ContentMeta {
        let mut meta = meta_with_genres(&["drama"]);
        meta.rating = Some(rating);
        meta.vote_count = votes;
        meta
    }

    fn rating_block(min: f64, preferred: f64, min_votes: u32) -> TimeBlock {
        block_with_criteria(
            "b",
            "00:00",
            "23:59",
            BlockCriteria {
                min_tmdb_rating: Some(min),
                preferred_tmdb_rating: Some(preferred),
                min_vote_count: Some(min_votes),
                ..BlockCriteria::default()
            },
        )
    }

    #[test]
    fn test_rating_categories() {
        assert_eq!(rating_category(Some(8.4)), Some("excellent"));
        assert_eq!(rating_category(Some(7.2)), Some("good"));
        assert_eq!(rating_category(Some(6.0)), Some("average"));
        assert_eq!(rating_category(Some(3.1)), Some("poor"));
        assert_eq!(rating_category(None), None);
    }

    #[test]
    fn test_above_preferred_is_excellent() {
        let block = rating_block(5.0, 7.0, 0);
        let profile = profile_with_block(&block);

        let result = RatingCriterion.evaluate(
            &movie("m", "Great", 120),
            Some(&rated(8.5, 10_000)),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_between_thresholds_is_linear() {
        let block = rating_block(5.0, 7.0, 0);
        let profile = profile_with_block(&block);

        let result = RatingCriterion.evaluate(
            &movie("m", "Mid", 120),
            Some(&rated(6.0, 1000)),
            &profile,
            Some(&block),
            None,
        );
        // halfway: 50 + 0.5*40
        assert_eq!(result.score, 70.0);
    }

    #[test]
    fn test_below_min_floors_low() {
        let block = rating_block(6.0, 8.0, 0);
        let profile = profile_with_block(&block);

        let result = RatingCriterion.evaluate(
            &movie("m", "Weak", 120),
            Some(&rated(3.0, 1000)),
            &profile,
            Some(&block),
            None,
        );
        // (3/6) * 40
        assert_eq!(result.score, 20.0);
    }

    #[test]
    fn test_confidence_penalty_for_thin_votes() {
        let block = rating_block(0.0, 7.0, 1000);
        let profile = profile_with_block(&block);

        // 7.5 rating but only 100 of 1000 required votes: -27 confidence
        let result = RatingCriterion.evaluate(
            &movie("m", "Obscure", 120),
            Some(&rated(7.5, 100)),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 73.0);
    }

    #[test]
    fn test_missing_metadata_neutral() {
        let profile = Profile::default();
        let result =
            RatingCriterion.evaluate(&movie("m", "NoMeta", 120), None, &profile, None, None);
        assert_eq!(result.score, 50.0);
    }
}
