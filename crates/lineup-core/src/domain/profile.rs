/// Profile configuration tree.
///
/// A profile bundles time blocks, global mandatory/forbidden/preferred
/// criteria, criterion weights and multipliers, the M/F/P point policy and
/// strategy flags. Profiles are value types: evaluators receive rule sets by
/// reference, never a back-pointer into the profile.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// M/F/P POLICY
// ============================================================================

/// Point policy for the Mandatory/Forbidden/Preferred rule triad.
/// Block-level overrides profile-level, which overrides these defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfpPolicy {
    pub mandatory_matched_bonus: f64,
    pub mandatory_missed_penalty: f64,
    pub forbidden_detected_penalty: f64,
    pub preferred_matched_bonus: f64,
}

impl Default for MfpPolicy {
    fn default() -> Self {
        Self {
            mandatory_matched_bonus: 10.0,
            mandatory_missed_penalty: -40.0,
            forbidden_detected_penalty: -400.0,
            preferred_matched_bonus: 20.0,
        }
    }
}

// ============================================================================
// CRITERION RULES
// ============================================================================

/// Per-criterion M/F/P rule set. Point overrides fall back to the policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionRules {
    pub mandatory_values: Vec<String>,
    pub mandatory_penalty: Option<f64>,
    pub forbidden_values: Vec<String>,
    pub forbidden_penalty: Option<f64>,
    pub preferred_values: Vec<String>,
    pub preferred_bonus: Option<f64>,
}

impl CriterionRules {
    pub fn is_empty(&self) -> bool {
        self.mandatory_values.is_empty()
            && self.forbidden_values.is_empty()
            && self.preferred_values.is_empty()
    }
}

// ============================================================================
// BLOCK CRITERIA
// ============================================================================

/// Criteria attached to one time block. Everything is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockCriteria {
    pub preferred_types: Vec<String>,
    pub allowed_types: Vec<String>,
    pub excluded_types: Vec<String>,

    pub preferred_genres: Vec<String>,
    pub allowed_genres: Vec<String>,
    pub forbidden_genres: Vec<String>,

    pub min_duration_min: Option<f64>,
    pub max_duration_min: Option<f64>,

    pub max_age_rating: Option<String>,

    pub min_tmdb_rating: Option<f64>,
    pub preferred_tmdb_rating: Option<f64>,
    pub min_vote_count: Option<u32>,

    pub exclude_keywords: Vec<String>,
    pub include_keywords: Vec<String>,

    pub forbidden_keywords: Vec<String>,
    pub preferred_keywords: Vec<String>,
    pub forbidden_studios: Vec<String>,
    pub preferred_studios: Vec<String>,

    pub type_rules: Option<CriterionRules>,
    pub duration_rules: Option<CriterionRules>,
    pub genre_rules: Option<CriterionRules>,
    pub timing_rules: Option<CriterionRules>,
    pub strategy_rules: Option<CriterionRules>,
    pub age_rules: Option<CriterionRules>,
    pub rating_rules: Option<CriterionRules>,
    pub filter_rules: Option<CriterionRules>,
    pub bonus_rules: Option<CriterionRules>,

    pub mfp_policy: Option<MfpPolicy>,
    pub criterion_multipliers: HashMap<String, f64>,
}

impl BlockCriteria {
    /// Rule set for a criterion by name, if configured.
    pub fn rules_for(&self, criterion: &str) -> Option<&CriterionRules> {
        match criterion {
            "type" => self.type_rules.as_ref(),
            "duration" => self.duration_rules.as_ref(),
            "genre" => self.genre_rules.as_ref(),
            "timing" => self.timing_rules.as_ref(),
            "strategy" => self.strategy_rules.as_ref(),
            "age" => self.age_rules.as_ref(),
            "rating" => self.rating_rules.as_ref(),
            "filter" => self.filter_rules.as_ref(),
            "bonus" => self.bonus_rules.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// TIME BLOCK CONFIG
// ============================================================================

fn default_block_start() -> String {
    "00:00".to_string()
}

fn default_block_end() -> String {
    "23:59".to_string()
}

/// User-authored block definition. `HH:MM` strings are parsed leniently by
/// the block schedule; `end <= start` marks an overnight block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlockConfig {
    pub name: String,
    #[serde(default = "default_block_start")]
    pub start_time: String,
    #[serde(default = "default_block_end")]
    pub end_time: String,
    #[serde(default)]
    pub criteria: BlockCriteria,
}

// ============================================================================
// GLOBAL M/F/P CRITERIA
// ============================================================================

/// Profile-level mandatory rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MandatoryRules {
    /// Content ids that must be reserved for the schedule.
    pub content_ids: Vec<String>,
    pub min_duration_min: Option<f64>,
    pub min_tmdb_rating: Option<f64>,
    /// At least one of these genres must be present.
    pub required_genres: Vec<String>,
}

/// Profile-level forbidden rules; matching content is excluded up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForbiddenRules {
    pub content_ids: Vec<String>,
    pub types: Vec<String>,
    /// Title substrings.
    pub keywords: Vec<String>,
    pub genres: Vec<String>,
}

/// Profile-level preferred hints (soft, scoring-only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferredRules {
    pub content_ids: Vec<String>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
}

/// Global criteria applied when no block is active, plus the M/F/P triad.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalCriteria {
    pub mandatory: MandatoryRules,
    pub forbidden: ForbiddenRules,
    pub preferred: PreferredRules,

    pub allowed_types: Vec<String>,
    pub forbidden_types: Vec<String>,

    pub allowed_genres: Vec<String>,
    pub preferred_genres: Vec<String>,
    pub forbidden_genres: Vec<String>,

    pub forbidden_keywords: Vec<String>,
    pub preferred_keywords: Vec<String>,
    pub forbidden_studios: Vec<String>,
    pub preferred_studios: Vec<String>,

    pub exclude_keywords: Vec<String>,
    pub include_keywords: Vec<String>,

    pub min_duration_min: Option<f64>,
    pub max_duration_min: Option<f64>,
    pub max_age_rating: Option<String>,
    pub min_tmdb_rating: Option<f64>,
    pub preferred_tmdb_rating: Option<f64>,
    pub min_vote_count: Option<u32>,
}

// ============================================================================
// SCORING WEIGHTS
// ============================================================================

/// Per-criterion weights (0-100, applied percentage-style). Criteria not
/// present fall back to their built-in default weight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringWeights(pub HashMap<String, f64>);

impl ScoringWeights {
    pub fn get(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).copied().unwrap_or(default)
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }
}

// ============================================================================
// STRATEGIES
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerInsertion {
    pub enabled: bool,
    pub types: Vec<String>,
}

impl FillerInsertion {
    /// Filler kinds, defaulting to trailers when unset.
    pub fn filler_types(&self) -> Vec<String> {
        if self.types.is_empty() {
            vec!["trailer".to_string()]
        } else {
            self.types.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusToggles {
    pub holiday_bonus: bool,
}

/// Programming strategy flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategies {
    pub maintain_sequence: bool,
    pub maximize_variety: bool,
    pub marathon_mode: bool,
    pub filler_insertion: FillerInsertion,
    pub bonuses: BonusToggles,
}

// ============================================================================
// ENHANCED CRITERIA
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsSafety {
    pub enabled: bool,
    pub safe_keywords: Vec<String>,
    pub dangerous_keywords: Vec<String>,
    pub safe_bonus_points: f64,
    pub dangerous_penalty_points: f64,
}

impl Default for KeywordsSafety {
    fn default() -> Self {
        Self {
            enabled: false,
            safe_keywords: Vec::new(),
            dangerous_keywords: Vec::new(),
            safe_bonus_points: 5.0,
            dangerous_penalty_points: -100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsFranchises {
    pub enabled: bool,
    pub preferred_collections: Vec<String>,
    pub collection_bonus_points: f64,
}

impl Default for CollectionsFranchises {
    fn default() -> Self {
        Self {
            enabled: false,
            preferred_collections: Vec::new(),
            collection_bonus_points: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CastCrew {
    pub enabled: bool,
    pub preferred_actors: Vec<String>,
    pub popular_actor_bonus: f64,
}

impl Default for CastCrew {
    fn default() -> Self {
        Self {
            enabled: false,
            preferred_actors: Vec::new(),
            popular_actor_bonus: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationalValue {
    pub enabled: bool,
    pub educational_keywords: Vec<String>,
    pub bonus_points: f64,
}

impl Default for EducationalValue {
    fn default() -> Self {
        Self {
            enabled: false,
            educational_keywords: Vec::new(),
            bonus_points: 5.0,
        }
    }
}

/// Optional fixed-point bonuses layered on top of the bonus criterion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancedCriteria {
    pub keywords_safety: KeywordsSafety,
    pub collections_franchises: CollectionsFranchises,
    pub cast_crew: CastCrew,
    pub educational_value: EducationalValue,
}

// ============================================================================
// PROFILE
// ============================================================================

/// A user-authored programming profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub libraries: Vec<String>,
    pub time_blocks: Vec<TimeBlockConfig>,
    pub mandatory_forbidden_criteria: GlobalCriteria,
    pub scoring_weights: ScoringWeights,
    pub criterion_multipliers: HashMap<String, f64>,
    pub mfp_policy: Option<MfpPolicy>,
    pub strategies: Strategies,
    pub enhanced_criteria: EnhancedCriteria,
}

impl Profile {
    /// Effective M/F/P policy for a block: block > profile > defaults.
    pub fn mfp_policy_for(&self, block_policy: Option<&MfpPolicy>) -> MfpPolicy {
        block_policy
            .copied()
            .or(self.mfp_policy)
            .unwrap_or_default()
    }

    /// Effective multiplier for a criterion: block > profile > 1.0.
    pub fn multiplier_for(
        &self,
        criterion: &str,
        block_multipliers: Option<&HashMap<String, f64>>,
    ) -> f64 {
        if let Some(bm) = block_multipliers {
            if let Some(m) = bm.get(criterion) {
                return *m;
            }
        }
        self.criterion_multipliers
            .get(criterion)
            .copied()
            .unwrap_or(1.0)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mfp_policy_defaults() {
        let policy = MfpPolicy::default();
        assert_eq!(policy.mandatory_matched_bonus, 10.0);
        assert_eq!(policy.mandatory_missed_penalty, -40.0);
        assert_eq!(policy.forbidden_detected_penalty, -400.0);
        assert_eq!(policy.preferred_matched_bonus, 20.0);
    }

    #[test]
    fn test_policy_precedence() {
        let mut profile = Profile::default();
        assert_eq!(
            profile.mfp_policy_for(None).forbidden_detected_penalty,
            -400.0
        );

        profile.mfp_policy = Some(MfpPolicy {
            forbidden_detected_penalty: -200.0,
            ..MfpPolicy::default()
        });
        assert_eq!(
            profile.mfp_policy_for(None).forbidden_detected_penalty,
            -200.0
        );

        let block_policy = MfpPolicy {
            forbidden_detected_penalty: -99.0,
            ..MfpPolicy::default()
        };
        assert_eq!(
            profile
                .mfp_policy_for(Some(&block_policy))
                .forbidden_detected_penalty,
            -99.0
        );
    }

    #[test]
    fn test_multiplier_precedence() {
        let mut profile = Profile::default();
        assert_eq!(profile.multiplier_for("genre", None), 1.0);

        profile.criterion_multipliers.insert("genre".into(), 1.5);
        assert_eq!(profile.multiplier_for("genre", None), 1.5);

        let mut block = HashMap::new();
        block.insert("genre".to_string(), 2.0);
        assert_eq!(profile.multiplier_for("genre", Some(&block)), 2.0);
        assert_eq!(profile.multiplier_for("type", Some(&block)), 1.0);
    }

    #[test]
    fn test_profile_deserializes_from_sparse_json() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "name": "evening",
            "time_blocks": [
                { "name": "prime", "start_time": "20:00", "end_time": "23:00" }
            ],
            "scoring_weights": { "genre": 30.0 }
        }))
        .unwrap();

        assert_eq!(profile.time_blocks.len(), 1);
        assert_eq!(profile.scoring_weights.get("genre", 25.0), 30.0);
        assert_eq!(profile.scoring_weights.get("type", 20.0), 20.0);
        assert!(profile.mfp_policy.is_none());
    }

    #[test]
    fn test_filler_types_default_to_trailer() {
        let filler = FillerInsertion::default();
        assert_eq!(filler.filler_types(), vec!["trailer".to_string()]);
    }
}
