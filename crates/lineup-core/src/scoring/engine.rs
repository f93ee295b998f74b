/// Scoring engine: runs all nine criteria, aggregates a weighted total and
/// applies the global forbidden/mandatory/keyword-multiplier layers.
use std::collections::BTreeMap;

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{
    AgeCriterion, BonusCriterion, Criterion, DurationCriterion, FilterCriterion, GenreCriterion,
    RatingCriterion, StrategyCriterion, TimingCriterion, TypeCriterion,
};
use crate::scoring::{
    CriterionDetails, CriterionResult, ForbiddenViolation, KeywordMatch, MandatoryPenalty,
    RuleOutcome, ScoringContext, ScoringResult,
};

pub struct ScoringEngine {
    criteria: Vec<Box<dyn Criterion>>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self {
            criteria: vec![
                Box::new(TypeCriterion),
                Box::new(DurationCriterion),
                Box::new(GenreCriterion),
                Box::new(TimingCriterion),
                Box::new(StrategyCriterion),
                Box::new(AgeCriterion),
                Box::new(RatingCriterion),
                Box::new(FilterCriterion),
                Box::new(BonusCriterion),
            ],
        }
    }

    /// Score one content item for a slot.
    pub fn score(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        ctx: Option<&ScoringContext>,
    ) -> ScoringResult {
        let mut criterion_results: BTreeMap<String, CriterionResult> = BTreeMap::new();
        let mut criterion_rule_violations: BTreeMap<String, RuleOutcome> = BTreeMap::new();

        for criterion in &self.criteria {
            let result = criterion.evaluate(content, meta, profile, block, ctx);
            if let Some(violation) = &result.rule_violation {
                criterion_rule_violations.insert(criterion.name().to_string(), violation.clone());
            }
            criterion_results.insert(criterion.name().to_string(), result);
        }

        let weighted_total = Self::weighted_total(&criterion_results);

        let mut forbidden_violations = self.check_forbidden(content, meta, profile, block);

        // Escalate per-criterion forbidden outcomes to schedule level, except
        // the bonus criterion whose categories are derived soft signals
        for (name, violation) in &criterion_rule_violations {
            if violation.is_forbidden() && name != "bonus" {
                forbidden_violations.push(ForbiddenViolation {
                    rule: format!("forbidden_{name}_rule"),
                    value: violation.values.join(", "),
                    message: format!(
                        "Content has forbidden {name}: {}",
                        violation.values.join(", ")
                    ),
                    criterion: Some(name.clone()),
                    penalty: Some(violation.delta),
                });
            }
        }

        let mandatory_penalties = self.check_mandatory(content, meta, profile);

        let mut final_score = if !forbidden_violations.is_empty() {
            0.0
        } else {
            let mut score = weighted_total;
            for penalty in &mandatory_penalties {
                score -= penalty.penalty;
            }
            score
        };

        let (keyword_multiplier, keyword_match) =
            self.keyword_multiplier(content, profile, block);
        if keyword_multiplier != 1.0 {
            final_score *= keyword_multiplier;
        }

        let bonuses_applied = criterion_results
            .get("bonus")
            .and_then(|r| r.details.as_ref())
            .map(|details| match details {
                CriterionDetails::Bonus(b) => b.bonuses_applied.clone(),
                _ => Vec::new(),
            })
            .unwrap_or_default();

        ScoringResult {
            total_score: final_score.clamp(0.0, 100.0),
            weighted_total,
            criteria: criterion_results,
            forbidden_violations,
            mandatory_penalties,
            bonuses_applied,
            keyword_multiplier,
            keyword_match,
            criterion_rule_violations,
        }
    }

    /// Normalized weighted total over all non-skipped criteria:
    /// `(Σ multiplied_weighted_score / Σ weight·multiplier) · 100`,
    /// defaulting to 50 when no weight remains.
    pub fn weighted_total(criterion_results: &BTreeMap<String, CriterionResult>) -> f64 {
        let mut total_weight = 0.0;
        let mut multiplied_weighted_sum = 0.0;
        for result in criterion_results.values() {
            total_weight += result.weight * result.multiplier;
            multiplied_weighted_sum += result.multiplied_weighted_score;
        }
        if total_weight > 0.0 {
            (multiplied_weighted_sum / total_weight) * 100.0
        } else {
            50.0
        }
    }

    /// Recompute `weighted_total` and `total_score` of an existing result
    /// after one of its criterion entries changed (timing recalculation),
    /// re-applying mandatory penalties and the keyword multiplier.
    pub fn refresh_totals(score: &mut ScoringResult) {
        score.weighted_total = Self::weighted_total(&score.criteria);
        if !score.forbidden_violations.is_empty() {
            score.total_score = 0.0;
            return;
        }
        let mut adjusted = score.weighted_total;
        for penalty in &score.mandatory_penalties {
            adjusted -= penalty.penalty;
        }
        if score.keyword_multiplier != 1.0 {
            adjusted *= score.keyword_multiplier;
        }
        score.total_score = adjusted.clamp(0.0, 100.0);
    }

    fn check_forbidden(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
    ) -> Vec<ForbiddenViolation> {
        let mut violations = Vec::new();
        let forbidden = &profile.mandatory_forbidden_criteria.forbidden;
        let title = content.title.to_lowercase();

        if forbidden.content_ids.contains(&content.id) {
            violations.push(ForbiddenViolation {
                rule: "forbidden_content_id".to_string(),
                value: content.id.clone(),
                message: format!("Content ID {} is forbidden", content.id),
                criterion: None,
                penalty: None,
            });
        }

        if content.kind.is_in(&forbidden.types) {
            violations.push(ForbiddenViolation {
                rule: "forbidden_type".to_string(),
                value: content.kind.as_str().to_string(),
                message: format!("Content type '{}' is forbidden", content.kind.as_str()),
                criterion: None,
                penalty: None,
            });
        }

        for keyword in &forbidden.keywords {
            if title.contains(&keyword.to_lowercase()) {
                violations.push(ForbiddenViolation {
                    rule: "forbidden_keyword_in_title".to_string(),
                    value: keyword.clone(),
                    message: format!("Title contains forbidden keyword '{keyword}'"),
                    criterion: None,
                    penalty: None,
                });
            }
        }

        if let Some(meta) = meta {
            let content_genres: Vec<String> =
                meta.genres.iter().map(|g| g.to_lowercase()).collect();

            for genre in &content_genres {
                if forbidden
                    .genres
                    .iter()
                    .any(|f| f.to_lowercase() == *genre)
                {
                    violations.push(ForbiddenViolation {
                        rule: "forbidden_genre".to_string(),
                        value: genre.clone(),
                        message: format!("Content has forbidden genre '{genre}'"),
                        criterion: None,
                        penalty: None,
                    });
                }
            }

            if let Some(block) = block {
                for genre in &content_genres {
                    let block_forbidden = block
                        .criteria
                        .forbidden_genres
                        .iter()
                        .any(|f| f.to_lowercase() == *genre);
                    let already = violations
                        .iter()
                        .any(|v| v.rule == "forbidden_genre" && v.value == *genre);
                    if block_forbidden && !already {
                        violations.push(ForbiddenViolation {
                            rule: "forbidden_genre_block".to_string(),
                            value: genre.clone(),
                            message: format!(
                                "Content has genre '{genre}' forbidden in time block"
                            ),
                            criterion: None,
                            penalty: None,
                        });
                    }
                }
            }
        }

        violations
    }

    fn check_mandatory(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
    ) -> Vec<MandatoryPenalty> {
        let mut penalties = Vec::new();
        let mandatory = &profile.mandatory_forbidden_criteria.mandatory;

        if let Some(min_duration) = mandatory.min_duration_min {
            let minutes = content.duration_minutes();
            if minutes < min_duration {
                penalties.push(MandatoryPenalty {
                    rule: "mandatory_min_duration".to_string(),
                    message: format!(
                        "Duration {minutes:.1}min below minimum {min_duration}min"
                    ),
                    penalty: 15.0,
                });
            }
        }

        if let Some(min_rating) = mandatory.min_tmdb_rating {
            let rating = meta.and_then(|m| m.rating).unwrap_or(0.0);
            if rating < min_rating {
                penalties.push(MandatoryPenalty {
                    rule: "mandatory_min_rating".to_string(),
                    message: format!("Rating {rating} below minimum {min_rating}"),
                    penalty: 10.0,
                });
            }
        }

        if !mandatory.required_genres.is_empty() {
            if let Some(meta) = meta {
                let content_genres: Vec<String> =
                    meta.genres.iter().map(|g| g.to_lowercase()).collect();
                let has_any = mandatory
                    .required_genres
                    .iter()
                    .any(|g| content_genres.contains(&g.to_lowercase()));
                if !has_any {
                    penalties.push(MandatoryPenalty {
                        rule: "mandatory_genre_missing".to_string(),
                        message: format!(
                            "Missing required genre from {:?}",
                            mandatory.required_genres
                        ),
                        penalty: 20.0,
                    });
                }
            }
        }

        penalties
    }

    /// Whole-score keyword multiplier from title substring matches.
    /// Exclusion always wins: 0.5 on any exclude hit, else 1.1 on an include
    /// hit, else 1.0. The profile's dangerous keywords merge into the
    /// exclude list.
    fn keyword_multiplier(
        &self,
        content: &Content,
        profile: &Profile,
        block: Option<&TimeBlock>,
    ) -> (f64, Option<KeywordMatch>) {
        let title = content.title.to_lowercase();
        if title.is_empty() {
            return (1.0, None);
        }

        let (mut exclude, include) = match block {
            Some(block) => (
                block.criteria.exclude_keywords.clone(),
                block.criteria.include_keywords.clone(),
            ),
            None => (
                profile.mandatory_forbidden_criteria.exclude_keywords.clone(),
                profile.mandatory_forbidden_criteria.include_keywords.clone(),
            ),
        };
        exclude.extend(
            profile
                .enhanced_criteria
                .keywords_safety
                .dangerous_keywords
                .iter()
                .cloned(),
        );

        for keyword in &exclude {
            if !keyword.is_empty() && title.contains(&keyword.to_lowercase()) {
                return (0.5, Some(KeywordMatch::Exclude));
            }
        }
        for keyword in &include {
            if !keyword.is_empty() && title.contains(&keyword.to_lowercase()) {
                return (1.1, Some(KeywordMatch::Include));
            }
        }
        (1.0, None)
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

    fn basic_block() -> TimeBlock {
        block_with_criteria("all", "00:00", "23:59", BlockCriteria::default())
    }

    #[test]
    fn test_score_produces_all_nine_criteria() {
        let block = basic_block();
        let profile = profile_with_block(&block);
        let meta = meta_with_genres(&["drama"]);

        let result = ScoringEngine::new().score(
            &movie("m", "Heat", 170),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );

        let names: Vec<&str> = result.criteria.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "age", "bonus", "duration", "filter", "genre", "rating", "strategy", "timing",
                "type"
            ]
        );
        assert!(result.total_score > 0.0);
        assert!(result.total_score <= 100.0);
    }

    #[test]
    fn test_forbidden_genre_zeroes_total() {
        let block = basic_block();
        let mut profile = profile_with_block(&block);
        profile
            .mandatory_forbidden_criteria
            .forbidden
            .genres = vec!["horror".to_string()];

        let meta = meta_with_genres(&["Horror"]);
        let result = ScoringEngine::new().score(
            &movie("m", "Scary", 90),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.total_score, 0.0);
        assert!(result.forbidden_violated());
        assert_eq!(result.forbidden_violations[0].rule, "forbidden_genre");
    }

    #[test]
    fn test_age_rule_escalates_as_forbidden_age_rule() {
        let block = block_with_criteria(
            "kids",
            "07:00",
            "10:00",
            BlockCriteria {
                max_age_rating: Some("PG".to_string()),
                ..BlockCriteria::default()
            },
        );
        let profile = profile_with_block(&block);
        let mut meta = meta_with_genres(&["action"]);
        meta.age_rating = Some("R".to_string());

        let result = ScoringEngine::new().score(
            &movie("m", "Hard", 110),
            Some(&meta),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.total_score, 0.0);
        assert!(result
            .forbidden_violations
            .iter()
            .any(|v| v.rule == "forbidden_age_rule"));
    }

    #[test]
    fn test_bonus_forbidden_outcome_not_escalated() {
        let block = block_with_criteria(
            "b",
            "00:00",
            "23:59",
            BlockCriteria {
                bonus_rules: Some(crate::domain::CriterionRules {
                    forbidden_values: vec!["recent".to_string()],
                    ..Default::default()
                }),
                ..BlockCriteria::default()
            },
        );
        let profile = profile_with_block(&block);
        let mut content = movie("m", "New", 100);
        content.year = Some(2025);
        let ctx = ScoringContext {
            current_time: Some(crate::testing::fixtures::dt(2025, 6, 1, 20, 0)),
            ..ScoringContext::default()
        };

        let result = ScoringEngine::new().score(
            &content,
            Some(&meta_with_genres(&["action"])),
            &profile,
            Some(&block),
            Some(&ctx),
        );
        // The bonus criterion records the outcome but the schedule level
        // stays clean
        assert!(result.criterion_rule_violations.contains_key("bonus"));
        assert!(!result.forbidden_violated());
        assert!(result.total_score > 0.0);
    }

    #[test]
    fn test_keyword_multiplier_exclude_beats_include() {
        let block = block_with_criteria(
            "b",
            "00:00",
            "23:59",
            BlockCriteria {
                exclude_keywords: vec!["remaster".to_string()],
                include_keywords: vec!["director".to_string()],
                ..BlockCriteria::default()
            },
        );
        let profile = profile_with_block(&block);

        let result = ScoringEngine::new().score(
            &movie("m", "Heat Director's Cut Remaster", 170),
            Some(&meta_with_genres(&["crime"])),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.keyword_multiplier, 0.5);
        assert_eq!(result.keyword_match, Some(KeywordMatch::Exclude));

        let result = ScoringEngine::new().score(
            &movie("m", "Heat Director's Cut", 170),
            Some(&meta_with_genres(&["crime"])),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.keyword_multiplier, 1.1);
        assert_eq!(result.keyword_match, Some(KeywordMatch::Include));
    }

    #[test]
    fn test_mandatory_penalties_subtract_from_total() {
        let block = basic_block();
        let mut profile = profile_with_block(&block);
        profile
            .mandatory_forbidden_criteria
            .mandatory
            .min_duration_min = Some(60.0);

        let engine = ScoringEngine::new();
        let meta = meta_with_genres(&["drama"]);

        let long = engine.score(&movie("m", "Long", 90), Some(&meta), &profile, Some(&block), None);
        let short =
            engine.score(&movie("m", "Short", 20), Some(&meta), &profile, Some(&block), None);

        assert!(long.mandatory_met());
        assert!(!short.mandatory_met());
        assert_eq!(short.mandatory_penalties[0].penalty, 15.0);
    }

    #[test]
    fn test_zero_weights_default_to_neutral_total() {
        let block = basic_block();
        let mut profile = profile_with_block(&block);
        for name in [
            "type", "duration", "genre", "timing", "strategy", "age", "rating", "filter", "bonus",
        ] {
            profile.scoring_weights.set(name, 0.0);
        }

        let result = ScoringEngine::new().score(
            &movie("m", "Any", 90),
            Some(&meta_with_genres(&["drama"])),
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.weighted_total, 50.0);
    }

    #[test]
    fn test_refresh_totals_mirrors_engine_formula() {
        let block = basic_block();
        let profile = profile_with_block(&block);
        let engine = ScoringEngine::new();
        let meta = meta_with_genres(&["drama"]);

        let mut result =
            engine.score(&movie("m", "Heat", 170), Some(&meta), &profile, Some(&block), None);
        let original_total = result.total_score;

        ScoringEngine::refresh_totals(&mut result);
        assert!((result.total_score - original_total).abs() < 1e-9);

        // Dropping the timing entry to skipped removes its weight
        let timing_weight = result.criteria["timing"].weight;
        assert!(timing_weight > 0.0);
        result
            .criteria
            .insert("timing".to_string(), CriterionResult::skipped("timing"));
        ScoringEngine::refresh_totals(&mut result);
        assert!(result.criteria["timing"].skipped);
    }
}
