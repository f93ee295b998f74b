/// Contextual bonuses: recency, classics, box-office success, collections,
/// popularity and seasonal content, each earnable as a category token that
/// block `bonus_rules` can boost, require or suppress. Enhanced criteria add
/// fixed points from profile config on top.
///
/// Year/month comparisons use the scheduled slot time from the scoring
/// context when present, so seeded runs stay reproducible; the wall clock is
/// only consulted for context-free ad-hoc scoring.
use chrono::{Datelike, Local};

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, CriterionRules, MfpPolicy, Profile};
use crate::scoring::criteria::{lowered, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{
    BonusDetails, CriterionDetails, CriterionResult, RuleKind, RuleOutcome, ScoringContext,
};

pub struct BonusCriterion;

pub const CATEGORY_RECENT: &[&str] = &["recent", "recency"];
pub const CATEGORY_OLD: &[&str] = &["old", "classic", "vintage", "retro", "ancient"];
pub const CATEGORY_BLOCKBUSTER: &[&str] = &["blockbuster", "commercial", "success"];
pub const CATEGORY_COLLECTION: &[&str] = &["collection", "franchise"];
pub const CATEGORY_POPULAR: &[&str] = &["popular", "trending"];
pub const CATEGORY_HOLIDAY: &[&str] = &["holiday", "seasonal", "christmas", "halloween"];

const HOLIDAY_KEYWORDS: &[&str] = &[
    "christmas",
    "holiday",
    "thanksgiving",
    "halloween",
    "noel",
    "noël",
];

struct BonusOutcome {
    score: f64,
    bonuses_applied: Vec<String>,
    categories_earned: Vec<String>,
    rule_violation: Option<RuleOutcome>,
}

struct CategoryLists {
    forbidden: Vec<String>,
    mandatory: Vec<String>,
    preferred: Vec<String>,
}

impl CategoryLists {
    fn from_rules(rules: Option<&CriterionRules>) -> Self {
        match rules {
            Some(rules) => Self {
                forbidden: lowered(&rules.forbidden_values),
                mandatory: lowered(&rules.mandatory_values),
                preferred: lowered(&rules.preferred_values),
            },
            None => Self {
                forbidden: Vec::new(),
                mandatory: Vec::new(),
                preferred: Vec::new(),
            },
        }
    }

    fn is_forbidden(&self, categories: &[&str]) -> bool {
        categories.iter().any(|c| self.forbidden.contains(&c.to_string()))
    }

    fn is_preferred(&self, categories: &[&str]) -> bool {
        categories.iter().any(|c| self.preferred.contains(&c.to_string()))
    }

    fn forbidden_hits(&self, categories: &[&str]) -> Vec<String> {
        categories
            .iter()
            .filter(|c| self.forbidden.contains(&c.to_string()))
            .map(|c| c.to_string())
            .collect()
    }
}

fn scaled_bonus(base_multiplier: f64, policy: &MfpPolicy) -> f64 {
    policy.preferred_matched_bonus * base_multiplier
}

impl BonusCriterion {
    fn calculate(
        &self,
        content: &Content,
        meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        ctx: Option<&ScoringContext>,
        policy: &MfpPolicy,
    ) -> BonusOutcome {
        let mut outcome = BonusOutcome {
            score: 50.0,
            bonuses_applied: Vec::new(),
            categories_earned: Vec::new(),
            rule_violation: None,
        };

        let Some(meta) = meta else {
            return outcome;
        };

        let bonus_rules = block.and_then(|b| b.criteria.bonus_rules.as_ref());
        let lists = CategoryLists::from_rules(bonus_rules);

        let forbidden_penalty = bonus_rules
            .and_then(|r| r.forbidden_penalty)
            .unwrap_or(policy.forbidden_detected_penalty);
        let preferred_bonus = bonus_rules
            .and_then(|r| r.preferred_bonus)
            .unwrap_or(policy.preferred_matched_bonus);

        let mut forbidden_detected: Vec<String> = Vec::new();

        let (current_year, current_month) = ctx
            .and_then(|c| c.current_time)
            .map(|t| (t.year(), t.month()))
            .unwrap_or_else(|| {
                let now = Local::now().naive_local();
                (now.year(), now.month())
            });

        // Release year: recent vs classic
        if let Some(year) = content.year {
            let age = current_year - year;
            if age <= 2 {
                if lists.is_forbidden(CATEGORY_RECENT) {
                    forbidden_detected.extend(lists.forbidden_hits(CATEGORY_RECENT));
                } else {
                    let bonus = if lists.is_preferred(CATEGORY_RECENT) {
                        preferred_bonus
                    } else {
                        scaled_bonus(0.5, policy)
                    };
                    outcome.score += bonus;
                    outcome
                        .bonuses_applied
                        .push(format!("Recent release ({year}): +{bonus:.0}"));
                    outcome
                        .categories_earned
                        .extend(CATEGORY_RECENT.iter().map(|c| c.to_string()));
                }
            } else if age <= 5 {
                if lists.is_forbidden(CATEGORY_RECENT) {
                    forbidden_detected.extend(lists.forbidden_hits(CATEGORY_RECENT));
                } else {
                    let bonus = if lists.is_preferred(CATEGORY_RECENT) {
                        preferred_bonus
                    } else {
                        scaled_bonus(0.25, policy)
                    };
                    outcome.score += bonus;
                    outcome
                        .bonuses_applied
                        .push(format!("Fairly recent ({year}): +{bonus:.0}"));
                    outcome
                        .categories_earned
                        .extend(CATEGORY_RECENT.iter().map(|c| c.to_string()));
                }
            } else if age > 20 {
                if lists.is_forbidden(CATEGORY_OLD) {
                    forbidden_detected.extend(lists.forbidden_hits(CATEGORY_OLD));
                } else if lists.is_preferred(CATEGORY_OLD) {
                    outcome.score += preferred_bonus;
                    outcome
                        .bonuses_applied
                        .push(format!("Classic ({year}): +{preferred_bonus:.0}"));
                    outcome
                        .categories_earned
                        .extend(CATEGORY_OLD.iter().map(|c| c.to_string()));
                }
            }
        }

        // Box-office success tiers
        if let (Some(budget), Some(revenue)) = (meta.budget, meta.revenue) {
            if budget > 0 && revenue > 0 {
                let tier = if revenue > budget * 3 {
                    Some((0.4, "Blockbuster (3x+ ROI)"))
                } else if revenue > budget * 2 {
                    Some((0.25, "Commercial success (2x+ ROI)"))
                } else if revenue > budget {
                    Some((0.15, "Profitable"))
                } else {
                    None
                };

                if let Some((scale, label)) = tier {
                    if lists.is_forbidden(CATEGORY_BLOCKBUSTER) {
                        forbidden_detected.extend(lists.forbidden_hits(CATEGORY_BLOCKBUSTER));
                    } else {
                        let bonus = if lists.is_preferred(CATEGORY_BLOCKBUSTER) {
                            preferred_bonus
                        } else {
                            scaled_bonus(scale, policy)
                        };
                        outcome.score += bonus;
                        outcome.bonuses_applied.push(format!("{label}: +{bonus:.0}"));
                        outcome
                            .categories_earned
                            .extend(CATEGORY_BLOCKBUSTER.iter().map(|c| c.to_string()));
                    }
                }
            }
        }

        // Collection membership
        if !meta.collections.is_empty() {
            if lists.is_forbidden(CATEGORY_COLLECTION) {
                forbidden_detected.extend(lists.forbidden_hits(CATEGORY_COLLECTION));
            } else {
                let bonus = if lists.is_preferred(CATEGORY_COLLECTION) {
                    preferred_bonus
                } else {
                    scaled_bonus(0.3, policy)
                        .min(meta.collections.len() as f64 * scaled_bonus(0.15, policy))
                };
                outcome.score += bonus;
                let names = meta
                    .collections
                    .iter()
                    .take(2)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                outcome
                    .bonuses_applied
                    .push(format!("Collection ({names}): +{bonus:.0}"));
                outcome
                    .categories_earned
                    .extend(CATEGORY_COLLECTION.iter().map(|c| c.to_string()));
            }
        }

        // Popularity tiers
        let popular_tier = if meta.vote_count > 10_000 {
            Some((0.3, "Very popular"))
        } else if meta.vote_count > 5_000 {
            Some((0.15, "Popular"))
        } else {
            None
        };
        if let Some((scale, label)) = popular_tier {
            if lists.is_forbidden(CATEGORY_POPULAR) {
                forbidden_detected.extend(lists.forbidden_hits(CATEGORY_POPULAR));
            } else {
                let bonus = if lists.is_preferred(CATEGORY_POPULAR) {
                    preferred_bonus
                } else {
                    scaled_bonus(scale, policy)
                };
                outcome.score += bonus;
                outcome
                    .bonuses_applied
                    .push(format!("{label} ({} votes): +{bonus:.0}", meta.vote_count));
                outcome
                    .categories_earned
                    .extend(CATEGORY_POPULAR.iter().map(|c| c.to_string()));
            }
        }

        // Seasonal content, only in Oct-Dec
        if profile.strategies.bonuses.holiday_bonus {
            let content_keywords = lowered(&meta.keywords);
            let is_holiday = content_keywords
                .iter()
                .any(|kw| HOLIDAY_KEYWORDS.iter().any(|h| kw.contains(h)));
            if is_holiday && (10..=12).contains(&current_month) {
                if lists.is_forbidden(CATEGORY_HOLIDAY) {
                    forbidden_detected.extend(lists.forbidden_hits(CATEGORY_HOLIDAY));
                } else {
                    let bonus = if lists.is_preferred(CATEGORY_HOLIDAY) {
                        preferred_bonus
                    } else {
                        scaled_bonus(0.4, policy)
                    };
                    outcome.score += bonus;
                    outcome
                        .bonuses_applied
                        .push(format!("Seasonal content: +{bonus:.0}"));
                    outcome
                        .categories_earned
                        .extend(CATEGORY_HOLIDAY.iter().map(|c| c.to_string()));
                }
            }
        }

        self.apply_enhanced(content, meta, profile, &mut outcome);

        // M/F/P over earned categories
        forbidden_detected.dedup();
        if !forbidden_detected.is_empty() {
            outcome.score += forbidden_penalty;
            outcome.bonuses_applied.push(format!(
                "Forbidden category ({}): {forbidden_penalty:.0}",
                forbidden_detected.join(", ")
            ));
            outcome.rule_violation = Some(RuleOutcome::new(
                RuleKind::Forbidden,
                forbidden_detected,
                forbidden_penalty,
            ));
        } else if !lists.mandatory.is_empty() {
            let earned = lowered(&outcome.categories_earned);
            let missing: Vec<String> = lists
                .mandatory
                .iter()
                .filter(|m| !earned.contains(m))
                .cloned()
                .collect();
            if !missing.is_empty() {
                let penalty = bonus_rules
                    .and_then(|r| r.mandatory_penalty)
                    .unwrap_or(policy.mandatory_missed_penalty);
                outcome.score += penalty;
                outcome.bonuses_applied.push(format!(
                    "Missing required bonus ({}): {penalty:.0}",
                    missing.join(", ")
                ));
                outcome.rule_violation =
                    Some(RuleOutcome::new(RuleKind::Mandatory, missing, penalty));
            }
        }

        if outcome.rule_violation.is_none() && !lists.preferred.is_empty() {
            let earned = lowered(&outcome.categories_earned);
            let matched: Vec<String> = lists
                .preferred
                .iter()
                .filter(|p| earned.contains(p))
                .cloned()
                .collect();
            if !matched.is_empty() {
                outcome.rule_violation = Some(RuleOutcome::new(
                    RuleKind::Preferred,
                    matched,
                    preferred_bonus,
                ));
            }
        }

        outcome.score = outcome.score.clamp(0.0, 100.0);
        outcome
    }

    fn apply_enhanced(
        &self,
        _content: &Content,
        meta: &ContentMeta,
        profile: &Profile,
        outcome: &mut BonusOutcome,
    ) {
        let enhanced = &profile.enhanced_criteria;
        let content_keywords = lowered(&meta.keywords);

        let safety = &enhanced.keywords_safety;
        if safety.enabled {
            let safe = lowered(&safety.safe_keywords);
            if content_keywords
                .iter()
                .any(|kw| safe.iter().any(|s| kw.contains(s)))
            {
                outcome.score += safety.safe_bonus_points;
                outcome
                    .bonuses_applied
                    .push(format!("Safe keyword: +{:.0}", safety.safe_bonus_points));
            }
            let dangerous = lowered(&safety.dangerous_keywords);
            if content_keywords
                .iter()
                .any(|kw| dangerous.iter().any(|d| kw.contains(d)))
            {
                outcome.score += safety.dangerous_penalty_points;
                outcome.bonuses_applied.push(format!(
                    "Dangerous keyword: {:.0}",
                    safety.dangerous_penalty_points
                ));
            }
        }

        let collections = &enhanced.collections_franchises;
        if collections.enabled {
            let content_collections = lowered(&meta.collections);
            let preferred = lowered(&collections.preferred_collections);
            let matched = content_collections
                .iter()
                .any(|c| preferred.iter().any(|p| c.contains(p) || p.contains(c)));
            if matched {
                outcome.score += collections.collection_bonus_points;
                outcome.bonuses_applied.push(format!(
                    "Preferred collection: +{:.0}",
                    collections.collection_bonus_points
                ));
            }
        }

        let cast_crew = &enhanced.cast_crew;
        if cast_crew.enabled {
            let preferred = lowered(&cast_crew.preferred_actors);
            let matched = meta
                .cast
                .iter()
                .take(5)
                .map(|a| a.to_lowercase())
                .any(|actor| preferred.iter().any(|p| actor.contains(p) || p.contains(&actor)));
            if matched {
                outcome.score += cast_crew.popular_actor_bonus;
                outcome
                    .bonuses_applied
                    .push(format!("Preferred actor: +{:.0}", cast_crew.popular_actor_bonus));
            }
        }

        let educational = &enhanced.educational_value;
        if educational.enabled {
            let edu = lowered(&educational.educational_keywords);
            if content_keywords
                .iter()
                .any(|kw| edu.iter().any(|e| kw.contains(e)))
            {
                outcome.score += educational.bonus_points;
                outcome
                    .bonuses_applied
                    .push(format!("Educational content: +{:.0}", educational.bonus_points));
            }
        }
    }
}

impl Criterion for BonusCriterion {
    fn name(&self) -> &'static str {
        "bonus"
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
        ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let policy = policy_of(profile, block);
        let outcome = self.calculate(content, meta, profile, block, ctx, &policy);

        CriterionResult::build(
            self.name(),
            outcome.score,
            weight_of(profile, self),
            multiplier_of(profile, block, self.name()),
        )
        .with_details(CriterionDetails::Bonus(BonusDetails {
            bonuses_applied: outcome.bonuses_applied,
            categories_earned: outcome.categories_earned,
        }))
        .with_rule_violation(outcome.rule_violation)
    }
}

// ============================================================================
// TESTS
// ============================================================================
