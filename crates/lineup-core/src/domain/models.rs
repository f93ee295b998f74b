/// Content-side domain models.
///
/// `Content` and `ContentMeta` are read-only inputs for the duration of a
/// run. Metadata is externally sourced and may be partially or entirely
/// absent; every consumer must tolerate missing fields.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::scoring::ScoringResult;

// ============================================================================
// CONTENT KIND
// ============================================================================

/// Kind of a video asset as reported by the media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Episode,
    Trailer,
    Short,
    Music,
    #[serde(other)]
    Other,
}

impl ContentKind {
    /// Lowercase token used when matching against profile rule lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Episode => "episode",
            ContentKind::Trailer => "trailer",
            ContentKind::Short => "short",
            ContentKind::Music => "music",
            ContentKind::Other => "other",
        }
    }

    /// True if this kind appears (case-insensitively) in `values`.
    pub fn is_in(&self, values: &[String]) -> bool {
        values.iter().any(|v| v.eq_ignore_ascii_case(self.as_str()))
    }
}

// ============================================================================
// CONTENT
// ============================================================================

/// A video asset eligible for scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Stable catalog id (unique within a run).
    pub id: String,

    /// Key on the external media server (used for sink pushes).
    #[serde(default)]
    pub external_key: String,

    pub title: String,

    #[serde(rename = "type")]
    pub kind: ContentKind,

    /// Runtime in milliseconds.
    pub duration_ms: i64,

    /// Release year, if known.
    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub library_id: Option<String>,
}

impl Content {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms as f64 / 60_000.0
    }
}

// ============================================================================
// CONTENT METADATA
// ============================================================================

/// Externally sourced metadata for a content item.
///
/// Every field is optional in spirit: an empty/None value routes the
/// affected criterion to its neutral score, never to an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMeta {
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub age_rating: Option<String>,
    /// Community rating on a 0-10 scale.
    pub rating: Option<f64>,
    pub vote_count: u32,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub studios: Vec<String>,
    pub collections: Vec<String>,
    pub cast: Vec<String>,
}

/// A content item paired with its (possibly absent) metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub content: Content,
    #[serde(default)]
    pub meta: Option<ContentMeta>,
}

impl ContentItem {
    pub fn new(content: Content, meta: Option<ContentMeta>) -> Self {
        Self { content, meta }
    }

    pub fn id(&self) -> &str {
        &self.content.id
    }
}

// ============================================================================
// SCHEDULED PROGRAM
// ============================================================================

/// Why a program replaced another during post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementReason {
    Forbidden,
    Improved,
    AiImproved,
}

/// One slot of a generated (or audited) schedule.
///
/// Times are wall-clock local; block boundaries are defined in local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledProgram {
    pub content: Content,
    #[serde(default)]
    pub meta: Option<ContentMeta>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub block_name: String,
    pub position: usize,
    pub score: ScoringResult,
    #[serde(default)]
    pub is_replacement: bool,
    #[serde(default)]
    pub replacement_reason: Option<ReplacementReason>,
    #[serde(default)]
    pub replaced_title: Option<String>,
}

impl ScheduledProgram {
    pub fn content_id(&self) -> &str {
        &self.content.id
    }

    pub fn is_forbidden(&self) -> bool {
        !self.score.forbidden_violations.is_empty()
    }

    pub fn duration_minutes(&self) -> f64 {
        self.content.duration_minutes()
    }
}

// ============================================================================
// PROGRAMMING RESULT
// ============================================================================

/// Result of a full generation run (or of a single iteration, when nested
/// inside `all_iterations`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgrammingResult {
    pub programs: Vec<ScheduledProgram>,
    pub total_score: f64,
    pub average_score: f64,
    /// 1-based iteration number; improve/replace passes take N+1 / N+2.
    pub iteration: u32,
    pub forbidden_count: usize,
    pub seed: u64,
    /// All candidate iterations, best first. Empty inside nested entries.
    #[serde(default)]
    pub all_iterations: Vec<ProgrammingResult>,
    #[serde(default)]
    pub is_optimized: bool,
    #[serde(default)]
    pub is_improved: bool,
    #[serde(default)]
    pub original_best_iteration: u32,
    #[serde(default)]
    pub original_best_score: f64,
    #[serde(default)]
    pub replaced_count: usize,
    #[serde(default)]
    pub improved_count: usize,
}

impl ProgrammingResult {
    /// Empty result used when no content survives profile filtering.
    pub fn empty(seed: u64, forbidden_count: usize) -> Self {
        Self {
            programs: Vec::new(),
            total_score: 0.0,
            average_score: 0.0,
            iteration: 0,
            forbidden_count,
            seed,
            all_iterations: Vec::new(),
            is_optimized: false,
            is_improved: false,
            original_best_iteration: 0,
            original_best_score: 0.0,
            replaced_count: 0,
            improved_count: 0,
        }
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.programs.iter().map(|p| p.duration_minutes()).sum()
    }
}

// ============================================================================
// PROGRAMMING REQUEST
// ============================================================================

/// Metadata fetch strategy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    None,
    PlexOnly,
    TmdbOnly,
    CacheOnly,
    #[default]
    Full,
    EnrichCache,
}

fn default_iterations() -> u32 {
    10
}

fn default_randomness() -> f64 {
    0.3
}

fn default_duration_days() -> u32 {
    1
}

/// Inbound request for a programming run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgrammingRequest {
    pub channel_id: String,
    pub profile_id: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_randomness")]
    pub randomness: f64,
    #[serde(default)]
    pub cache_mode: CacheMode,
    #[serde(default)]
    pub preview_only: bool,
    #[serde(default)]
    pub replace_forbidden: bool,
    #[serde(default)]
    pub improve_best: bool,
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
    /// Local wall-clock start; defaults to "now" at the boundary.
    #[serde(default)]
    pub start_datetime: Option<NaiveDateTime>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub ai_improve: bool,
    #[serde(default)]
    pub ai_prompt: Option<String>,
    #[serde(default)]
    pub ai_model: Option<String>,
}

impl ProgrammingRequest {
    /// Validate the tunable ranges before a run is enqueued.
    pub fn validate(&self) -> Result<(), super::DomainError> {
        if self.iterations < 1 {
            return Err(super::DomainError::config("iterations must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.randomness) {
            return Err(super::DomainError::config(
                "randomness must be between 0.0 and 1.0",
            ));
        }
        if !(1..=30).contains(&self.duration_days) {
            return Err(super::DomainError::config(
                "duration_days must be between 1 and 30",
            ));
        }
        Ok(())
    }

    pub fn duration_hours(&self) -> i64 {
        self.duration_days as i64 * 24
    }
}

// ============================================================================
// TESTS
// ============================================================================
