/// Per-block pre-selection: classify content into four tiers by M/F/P match
/// so the greedy loop sees good candidates first.
///
/// - Tier 1: at least one preferred match, no mandatory misses, no forbidden
/// - Tier 2: no preferred match, no mandatory misses, no forbidden
/// - Tier 3: mandatory misses but no forbidden
/// - Tier 4: forbidden violations
///
/// Hard block constraints (age ceiling, duration bounds) count as forbidden.
use std::collections::BTreeSet;

use crate::blocks::TimeBlock;
use crate::domain::{ContentItem, CriterionRules};
use crate::scoring::criteria::age::rating_level;
use crate::scoring::criteria::duration::duration_category;
use crate::scoring::criteria::rating::rating_category;

#[derive(Debug, Clone)]
pub struct PreselectionResult {
    pub tier: u8,
    pub preselect_score: i64,
    pub preferred_matches: Vec<String>,
    pub mandatory_matches: Vec<String>,
    pub mandatory_misses: Vec<String>,
    pub forbidden_violations: Vec<String>,
}

struct RuleSets<'a> {
    genre: Option<MfpSets>,
    bonus: Option<&'a CriterionRules>,
    rating: Option<&'a CriterionRules>,
    filter: Option<&'a CriterionRules>,
    age: Option<&'a CriterionRules>,
    type_: Option<&'a CriterionRules>,
    duration: Option<&'a CriterionRules>,
}

struct MfpSets {
    preferred: Vec<String>,
    mandatory: Vec<String>,
    forbidden: Vec<String>,
}

fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

fn extract_rules(block: &TimeBlock) -> RuleSets<'_> {
    let criteria = &block.criteria;

    // Genre merges the rule set with the direct block lists
    let mut genre: Option<MfpSets> = None;
    let has_genre_config = criteria.genre_rules.is_some()
        || !criteria.preferred_genres.is_empty()
        || !criteria.forbidden_genres.is_empty()
        || !criteria.allowed_genres.is_empty();
    if has_genre_config {
        let mut sets = MfpSets {
            preferred: lowered(&criteria.preferred_genres),
            mandatory: lowered(&criteria.allowed_genres),
            forbidden: lowered(&criteria.forbidden_genres),
        };
        if let Some(rules) = &criteria.genre_rules {
            sets.preferred.extend(lowered(&rules.preferred_values));
            sets.mandatory.extend(lowered(&rules.mandatory_values));
            sets.forbidden.extend(lowered(&rules.forbidden_values));
        }
        genre = Some(sets);
    }

    RuleSets {
        genre,
        bonus: criteria.bonus_rules.as_ref(),
        rating: criteria.rating_rules.as_ref(),
        filter: criteria.filter_rules.as_ref(),
        age: criteria.age_rules.as_ref(),
        type_: criteria.type_rules.as_ref(),
        duration: criteria.duration_rules.as_ref(),
    }
}

/// Bonus categories a content item qualifies for, mirroring the bonus
/// criterion's derivation. `reference_year` keeps generation deterministic.
pub fn bonus_categories(item: &ContentItem, reference_year: i32) -> BTreeSet<String> {
    let mut categories = BTreeSet::new();
    let Some(meta) = &item.meta else {
        return categories;
    };

    if let (Some(budget), Some(revenue)) = (meta.budget, meta.revenue) {
        if budget > 0 && revenue > budget * 2 {
            categories.insert("blockbuster".to_string());
        }
    }

    if meta.vote_count >= 5000 {
        categories.insert("popular".to_string());
    }

    if !meta.collections.is_empty() {
        categories.insert("collection".to_string());
        categories.insert("franchise".to_string());
    }

    if let Some(year) = item.content.year {
        let age = reference_year - year;
        if age <= 2 {
            categories.insert("recent".to_string());
            categories.insert("recency".to_string());
        } else if age <= 5 {
            categories.insert("recent".to_string());
        }
        if age >= 20 {
            categories.insert("old".to_string());
            categories.insert("classic".to_string());
            categories.insert("vintage".to_string());
        }
    }

    categories
}

/// Searchable keyword tokens: metadata keywords, studios, collection names
/// plus title words longer than three characters.
pub fn content_keywords(item: &ContentItem) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();

    if let Some(meta) = &item.meta {
        for kw in &meta.keywords {
            keywords.insert(kw.to_lowercase());
        }
        for studio in &meta.studios {
            keywords.insert(studio.to_lowercase());
        }
        for collection in &meta.collections {
            keywords.insert(collection.to_lowercase());
            keywords.insert("franchise".to_string());
        }
    }

    for word in item.content.title.split_whitespace() {
        if word.len() > 3 {
            keywords.insert(word.to_lowercase());
        }
    }

    keywords
}

fn check_token_rules(
    label: &str,
    token: Option<&str>,
    rules: &CriterionRules,
    preferred_matches: &mut Vec<String>,
    mandatory_matches: &mut Vec<String>,
    mandatory_misses: &mut Vec<String>,
    forbidden_violations: &mut Vec<String>,
) {
    let token = token.map(|t| t.to_lowercase());
    if let Some(token) = &token {
        if lowered(&rules.preferred_values).contains(token) {
            preferred_matches.push(format!("{label}:{token}"));
        }
        if lowered(&rules.mandatory_values).contains(token) {
            mandatory_matches.push(format!("{label}:{token}"));
        }
        if lowered(&rules.forbidden_values).contains(token) {
            forbidden_violations.push(format!("{label}:{token}"));
        }
    }
    let mandatory = lowered(&rules.mandatory_values);
    let satisfied = token
        .as_ref()
        .map(|t| mandatory.contains(t))
        .unwrap_or(false);
    if !mandatory.is_empty() && !satisfied {
        mandatory_misses.push(format!("{label}:required"));
    }
}

/// Evaluate one content item against a block's rule sets and hard
/// constraints.
pub fn evaluate_preselection(
    item: &ContentItem,
    block: &TimeBlock,
    reference_year: i32,
) -> PreselectionResult {
    let rules = extract_rules(block);

    let mut preferred_matches: Vec<String> = Vec::new();
    let mut mandatory_matches: Vec<String> = Vec::new();
    let mut mandatory_misses: Vec<String> = Vec::new();
    let mut forbidden_violations: Vec<String> = Vec::new();

    let content_genres: BTreeSet<String> = item
        .meta
        .as_ref()
        .map(|m| m.genres.iter().map(|g| g.to_lowercase()).collect())
        .unwrap_or_default();

    if let Some(genre) = &rules.genre {
        for pref in &genre.preferred {
            if content_genres.contains(pref) {
                preferred_matches.push(format!("genre:{pref}"));
            }
        }
        for mand in &genre.mandatory {
            if content_genres.contains(mand) {
                mandatory_matches.push(format!("genre:{mand}"));
            } else {
                mandatory_misses.push(format!("genre:{mand}"));
            }
        }
        for forb in &genre.forbidden {
            if content_genres.contains(forb) {
                forbidden_violations.push(format!("genre:{forb}"));
            }
        }
    }

    if let Some(bonus_rules) = rules.bonus {
        let categories = bonus_categories(item, reference_year);
        for pref in &lowered(&bonus_rules.preferred_values) {
            if categories.contains(pref) {
                preferred_matches.push(format!("bonus:{pref}"));
            }
        }
        for mand in &lowered(&bonus_rules.mandatory_values) {
            if categories.contains(mand) {
                mandatory_matches.push(format!("bonus:{mand}"));
            } else {
                mandatory_misses.push(format!("bonus:{mand}"));
            }
        }
        for forb in &lowered(&bonus_rules.forbidden_values) {
            if categories.contains(forb) {
                forbidden_violations.push(format!("bonus:{forb}"));
            }
        }
    }

    if let Some(rating_rules) = rules.rating {
        let category = item.meta.as_ref().and_then(|m| rating_category(m.rating));
        check_token_rules(
            "rating",
            category,
            rating_rules,
            &mut preferred_matches,
            &mut mandatory_matches,
            &mut mandatory_misses,
            &mut forbidden_violations,
        );
    }

    if let Some(filter_rules) = rules.filter {
        let keywords = content_keywords(item);
        for pref in &lowered(&filter_rules.preferred_values) {
            if keywords.contains(pref) {
                preferred_matches.push(format!("filter:{pref}"));
            }
        }
        for mand in &lowered(&filter_rules.mandatory_values) {
            if keywords.contains(mand) {
                mandatory_matches.push(format!("filter:{mand}"));
            } else {
                mandatory_misses.push(format!("filter:{mand}"));
            }
        }
        for forb in &lowered(&filter_rules.forbidden_values) {
            if keywords.contains(forb) {
                forbidden_violations.push(format!("filter:{forb}"));
            }
        }
    }

    if let Some(age_rules) = rules.age {
        if let Some(rating) = item
            .meta
            .as_ref()
            .and_then(|m| m.age_rating.as_deref())
            .filter(|r| !r.is_empty())
        {
            let rating = rating.to_lowercase();
            if lowered(&age_rules.preferred_values).contains(&rating) {
                preferred_matches.push(format!("age:{rating}"));
            }
            if lowered(&age_rules.forbidden_values).contains(&rating) {
                forbidden_violations.push(format!("age:{rating}"));
            }
        }
    }

    // Hard constraint: block age ceiling
    if let Some(max_rating) = &block.criteria.max_age_rating {
        if let Some(rating) = item
            .meta
            .as_ref()
            .and_then(|m| m.age_rating.as_deref())
            .filter(|r| !r.is_empty())
        {
            if rating_level(rating) > rating_level(max_rating) {
                forbidden_violations
                    .push(format!("age:exceeds_max({rating}>{max_rating})"));
            }
        }
    }

    if let Some(type_rules) = rules.type_ {
        check_token_rules(
            "type",
            Some(item.content.kind.as_str()),
            type_rules,
            &mut preferred_matches,
            &mut mandatory_matches,
            &mut mandatory_misses,
            &mut forbidden_violations,
        );
    }

    if let Some(duration_rules) = rules.duration {
        let category = duration_category(item.content.duration_ms);
        check_token_rules(
            "duration",
            category,
            duration_rules,
            &mut preferred_matches,
            &mut mandatory_matches,
            &mut mandatory_misses,
            &mut forbidden_violations,
        );
    }

    // Hard constraints: duration bounds
    let minutes = item.content.duration_minutes();
    if let Some(min) = block.criteria.min_duration_min {
        if minutes < min {
            forbidden_violations.push(format!("duration:below_min({minutes:.0}<{min})"));
        }
    }
    if let Some(max) = block.criteria.max_duration_min {
        if minutes > max {
            forbidden_violations.push(format!("duration:above_max({minutes:.0}>{max})"));
        }
    }

    let tier = if !forbidden_violations.is_empty() {
        4
    } else if !preferred_matches.is_empty() && mandatory_misses.is_empty() {
        1
    } else if mandatory_misses.is_empty() {
        2
    } else {
        3
    };

    let preselect_score = preferred_matches.len() as i64 * 10 + mandatory_matches.len() as i64 * 5
        - mandatory_misses.len() as i64 * 3;

    PreselectionResult {
        tier,
        preselect_score,
        preferred_matches,
        mandatory_matches,
        mandatory_misses,
        forbidden_violations,
    }
}

/// Order a pool for a block: tier ascending, then preselection score
/// descending. A block without criteria returns the pool untouched.
pub fn prefilter_for_block(
    items: &[ContentItem],
    block: &TimeBlock,
    reference_year: i32,
) -> Vec<ContentItem> {
    let mut scored: Vec<(ContentItem, PreselectionResult)> = items
        .iter()
        .map(|item| {
            let result = evaluate_preselection(item, block, reference_year);
            (item.clone(), result)
        })
        .collect();

    let mut tier_counts = [0usize; 4];
    for (_, result) in &scored {
        tier_counts[result.tier as usize - 1] += 1;
    }
    tracing::debug!(
        block = %block.name,
        tier1 = tier_counts[0],
        tier2 = tier_counts[1],
        tier3 = tier_counts[2],
        tier4 = tier_counts[3],
        "block preselection"
    );

    scored.sort_by(|a, b| {
        a.1.tier
            .cmp(&b.1.tier)
            .then(b.1.preselect_score.cmp(&a.1.preselect_score))
    });

    scored.into_iter().map(|(item, _)| item).collect()
}

// ============================================================================
// TESTS
// ============================================================================
