/// Programming generator: N seeded iterations of greedy schedule assembly
/// with randomness-weighted candidate selection, followed by the optional
/// improve and replace-forbidden passes.
pub mod passes;
pub mod postprocess;
pub mod prefilter;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::blocks::TimeBlockSchedule;
use crate::domain::{ContentItem, DomainError, Profile, ProgrammingResult, ScheduledProgram};
use crate::scoring::{ScoringContext, ScoringEngine, ScoringResult};

// ============================================================================
// CANCELLATION
// ============================================================================

/// Cooperative cancellation flag checked at iteration boundaries and
/// between post-processing passes. Partial work is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// PARAMETERS & PROGRESS
// ============================================================================

/// Tunables for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub start: NaiveDateTime,
    pub duration_hours: i64,
    pub iterations: u32,
    /// 0.0 = always pick the best candidate, 1.0 = uniform selection.
    pub randomness: f64,
    pub seed: Option<u64>,
    pub replace_forbidden: bool,
    pub improve_best: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub iteration: u32,
    pub total_iterations: u32,
    pub best_score: f64,
}

pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

// ============================================================================
// SELECTION
// ============================================================================

/// Pick an index into a score-descending candidate list.
///
/// With zero randomness (or a single candidate) the top candidate wins.
/// Otherwise each candidate gets weight `(score/max)·(1−r) + r`, weights are
/// normalized, and a uniform draw lands in a cumulative bucket, so r = 1
/// yields a uniform pick across the pool.
pub(crate) fn select_weighted_index(
    scores_desc: &[f64],
    randomness: f64,
    rng: &mut StdRng,
) -> usize {
    if scores_desc.is_empty() {
        return 0;
    }
    if randomness <= 0.0 || scores_desc.len() == 1 {
        return 0;
    }

    let max_score = scores_desc[0].max(1.0);
    let weights: Vec<f64> = scores_desc
        .iter()
        .map(|score| (score / max_score) * (1.0 - randomness) + randomness)
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }

    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (idx, weight) in weights.iter().enumerate() {
        cumulative += weight / total;
        if draw <= cumulative {
            return idx;
        }
    }
    0
}

// ============================================================================
// GENERATOR
// ============================================================================

pub struct Generator {
    engine: ScoringEngine,
    on_progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            engine: ScoringEngine::new(),
            on_progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Run the full generation: N iterations, keep the best, then the
    /// optional improve and replace-forbidden passes (improve first; the
    /// replace pass operates on the improved baseline).
    pub fn generate(
        &self,
        pool: &[ContentItem],
        profile: &Profile,
        params: &GenerationParams,
    ) -> Result<ProgrammingResult, DomainError> {
        if params.iterations < 1 {
            return Err(DomainError::config("iterations must be >= 1"));
        }
        if !(0.0..=1.0).contains(&params.randomness) {
            return Err(DomainError::config("randomness must be between 0.0 and 1.0"));
        }

        let seed = params
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..(1u64 << 31)));
        let schedule = TimeBlockSchedule::from_profile(profile);
        let reference_year = params.start.year();

        let filtered = self.filter_forbidden(pool, profile);
        tracing::info!(
            removed = pool.len() - filtered.len(),
            remaining = filtered.len(),
            "filtered profile-level forbidden content"
        );
        let mandatory_ids = self.mandatory_ids(pool, profile);
        if !mandatory_ids.is_empty() {
            tracing::info!(count = mandatory_ids.len(), "reserved mandatory content");
        }

        let mut all_results: Vec<ProgrammingResult> = Vec::new();
        let mut best: Option<ProgrammingResult> = None;

        for i in 0..params.iterations {
            if self.cancel.is_cancelled() {
                return Err(DomainError::internal("generation cancelled"));
            }

            let iter_seed = seed + i as u64;
            let result = self.generate_iteration(
                &filtered,
                &mandatory_ids,
                profile,
                &schedule,
                params.start,
                params.duration_hours,
                params.randomness,
                i + 1,
                iter_seed,
                reference_year,
            );

            let is_new_best = best
                .as_ref()
                .map(|b| result.total_score > b.total_score)
                .unwrap_or(true);
            if is_new_best {
                tracing::info!(
                    iteration = i + 1,
                    score = result.total_score,
                    average = result.average_score,
                    "new best iteration"
                );
                best = Some(result.clone());
            }
            all_results.push(result);

            if let Some(callback) = &self.on_progress {
                callback(ProgressUpdate {
                    iteration: i + 1,
                    total_iterations: params.iterations,
                    best_score: best.as_ref().map(|b| b.total_score).unwrap_or(0.0),
                });
            }
        }

        all_results.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let Some(mut best) = best else {
            return Ok(ProgrammingResult::empty(seed, pool.len() - filtered.len()));
        };

        let original_best_iteration = best.iteration;
        let original_best_score = best.average_score;

        if params.improve_best && all_results.len() > 1 {
            if self.cancel.is_cancelled() {
                return Err(DomainError::internal("generation cancelled"));
            }
            let mut rng = StdRng::seed_from_u64(seed + params.iterations as u64 + 1);
            let improved = passes::improve_best_programs(
                &best,
                &all_results,
                params.randomness,
                profile,
                &schedule,
                &self.engine,
                params.iterations + 1,
                &mut rng,
            );
            if improved.is_improved {
                all_results.insert(0, improved.clone());
                best = improved;
            }
        }

        if params.replace_forbidden && !all_results.is_empty() {
            if self.cancel.is_cancelled() {
                return Err(DomainError::internal("generation cancelled"));
            }
            let next_iteration = if params.improve_best && best.is_improved {
                params.iterations + 2
            } else {
                params.iterations + 1
            };
            let optimized = passes::replace_forbidden_programs(
                &best,
                &all_results,
                &filtered,
                profile,
                &schedule,
                &self.engine,
                next_iteration,
                reference_year,
            );
            if optimized.is_optimized {
                all_results.insert(0, optimized.clone());
                best = optimized;
            }
        }

        if best.is_optimized || best.is_improved {
            best.original_best_iteration = original_best_iteration;
            best.original_best_score = original_best_score;
        }
        best.all_iterations = all_results;

        Ok(best)
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_iteration(
        &self,
        pool: &[ContentItem],
        mandatory_ids: &HashSet<String>,
        profile: &Profile,
        schedule: &TimeBlockSchedule,
        start: NaiveDateTime,
        duration_hours: i64,
        randomness: f64,
        iteration: u32,
        seed: u64,
        reference_year: i32,
    ) -> ProgrammingResult {
        let mut rng = StdRng::seed_from_u64(seed);
        let end_time = start + Duration::hours(duration_hours);

        let mut current_time = start;
        let mut position = 0usize;
        let mut programs: Vec<ScheduledProgram> = Vec::new();

        // Mandatory content is reserved up front so it is never duplicated
        let mut base_available: Vec<ContentItem> = pool
            .iter()
            .filter(|item| !mandatory_ids.contains(item.id()))
            .cloned()
            .collect();

        let mut current_block_name: Option<String> = None;
        let mut block_filtered: Vec<ContentItem> = Vec::new();

        while current_time < end_time && !base_available.is_empty() {
            let block = schedule.locate(current_time).cloned();

            let mut is_first_in_block = false;
            let mut block_start = None;
            let mut block_end = None;
            if let Some(block) = &block {
                block_start = Some(schedule.block_start(current_time, block));
                block_end = Some(schedule.block_end(current_time, block));
                if current_block_name.as_deref() != Some(block.name.as_str()) {
                    is_first_in_block = true;
                    current_block_name = Some(block.name.clone());
                    block_filtered =
                        prefilter::prefilter_for_block(&base_available, block, reference_year);
                    if block_filtered.is_empty() {
                        tracing::warn!(
                            block = %block.name,
                            "no content passes pre-filter, using full pool"
                        );
                        block_filtered = base_available.clone();
                    }
                }
            }

            let ctx = ScoringContext {
                current_time: Some(current_time),
                block_start,
                block_end,
                is_first_in_block,
                // Not known until post-processing
                is_last_in_block: false,
                is_schedule_start: position == 0,
            };

            let available: &[ContentItem] = if block_filtered.is_empty() {
                &base_available
            } else {
                &block_filtered
            };

            // Forbidden candidates stay visible: without the replace pass
            // they may still be chosen, and the audit trail shows why
            let mut scored: Vec<(usize, ScoringResult)> = available
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    let score = self.engine.score(
                        &item.content,
                        item.meta.as_ref(),
                        profile,
                        block.as_ref(),
                        Some(&ctx),
                    );
                    (idx, score)
                })
                .collect();
            if scored.is_empty() {
                break;
            }
            scored.sort_by(|a, b| {
                b.1.total_score
                    .partial_cmp(&a.1.total_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let scores: Vec<f64> = scored.iter().map(|(_, s)| s.total_score).collect();
            let pick = select_weighted_index(&scores, randomness, &mut rng);
            let (available_idx, score) = scored.swap_remove(pick);
            let item = available[available_idx].clone();

            if !score.forbidden_violations.is_empty() {
                tracing::warn!(
                    position,
                    title = %item.content.title,
                    violations = score.forbidden_violations.len(),
                    "selected program carries forbidden violations"
                );
            }

            let program_end = current_time + Duration::milliseconds(item.content.duration_ms);
            programs.push(ScheduledProgram {
                content: item.content.clone(),
                meta: item.meta.clone(),
                start_time: current_time,
                end_time: program_end,
                block_name: block
                    .as_ref()
                    .map(|b| b.name.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                position,
                score,
                is_replacement: false,
                replacement_reason: None,
                replaced_title: None,
            });

            current_time = program_end;
            position += 1;
            let used_id = item.content.id.clone();
            base_available.retain(|c| c.content.id != used_id);
            block_filtered.retain(|c| c.content.id != used_id);
        }

        // Realized-time block names first, then first/last timing per
        // block instance
        postprocess::recalculate_block_names(&mut programs, schedule);
        postprocess::recalculate_timing_scores(&mut programs, profile, schedule);

        let total_score: f64 = programs.iter().map(|p| p.score.total_score).sum();
        let average_score = if programs.is_empty() {
            0.0
        } else {
            total_score / programs.len() as f64
        };
        let forbidden_count = programs.iter().filter(|p| p.is_forbidden()).count();

        ProgrammingResult {
            programs,
            total_score,
            average_score,
            iteration,
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

    /// Score an externally supplied playlist against a profile for audit:
    /// blocks are assigned from each item's realized start time, then the
    /// block-instance timing pass applies first/last semantics.
    pub fn score_playlist(
        &self,
        items: &[(ContentItem, NaiveDateTime)],
        profile: &Profile,
    ) -> ScoredPlaylist {
        let schedule = TimeBlockSchedule::from_profile(profile);

        let mut programs: Vec<ScheduledProgram> = items
            .iter()
            .enumerate()
            .map(|(position, (item, start))| {
                let block = schedule.locate(*start).cloned();
                let ctx = ScoringContext {
                    current_time: Some(*start),
                    block_start: block.as_ref().map(|b| schedule.block_start(*start, b)),
                    block_end: block.as_ref().map(|b| schedule.block_end(*start, b)),
                    is_first_in_block: position == 0,
                    is_last_in_block: false,
                    is_schedule_start: position == 0,
                };
                let score = self.engine.score(
                    &item.content,
                    item.meta.as_ref(),
                    profile,
                    block.as_ref(),
                    Some(&ctx),
                );
                ScheduledProgram {
                    content: item.content.clone(),
                    meta: item.meta.clone(),
                    start_time: *start,
                    end_time: *start + Duration::milliseconds(item.content.duration_ms),
                    block_name: block
                        .map(|b| b.name)
                        .unwrap_or_else(|| "Unknown".to_string()),
                    position,
                    score,
                    is_replacement: false,
                    replacement_reason: None,
                    replaced_title: None,
                }
            })
            .collect();

        postprocess::recalculate_block_names(&mut programs, &schedule);
        postprocess::recalculate_timing_scores(&mut programs, profile, &schedule);

        let total_score: f64 = programs.iter().map(|p| p.score.total_score).sum();
        let average_score = if programs.is_empty() {
            0.0
        } else {
            total_score / programs.len() as f64
        };

        ScoredPlaylist {
            programs,
            total_score,
            average_score,
        }
    }

    fn filter_forbidden(&self, pool: &[ContentItem], profile: &Profile) -> Vec<ContentItem> {
        let forbidden = &profile.mandatory_forbidden_criteria.forbidden;
        let forbidden_ids: HashSet<&String> = forbidden.content_ids.iter().collect();
        let forbidden_keywords: Vec<String> =
            forbidden.keywords.iter().map(|k| k.to_lowercase()).collect();
        let forbidden_genres: HashSet<String> =
            forbidden.genres.iter().map(|g| g.to_lowercase()).collect();

        pool.iter()
            .filter(|item| {
                if forbidden_ids.contains(&item.content.id) {
                    return false;
                }
                if item.content.kind.is_in(&forbidden.types) {
                    return false;
                }
                let title = item.content.title.to_lowercase();
                if forbidden_keywords.iter().any(|kw| title.contains(kw)) {
                    return false;
                }
                if let Some(meta) = &item.meta {
                    if meta
                        .genres
                        .iter()
                        .any(|g| forbidden_genres.contains(&g.to_lowercase()))
                    {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect()
    }

    fn mandatory_ids(&self, pool: &[ContentItem], profile: &Profile) -> HashSet<String> {
        let mandatory = &profile.mandatory_forbidden_criteria.mandatory;
        pool.iter()
            .filter(|item| mandatory.content_ids.contains(&item.content.id))
            .map(|item| item.content.id.clone())
            .collect()
    }
}

/// Result of the playlist audit path.
#[derive(Debug, Clone)]
pub struct ScoredPlaylist {
    pub programs: Vec<ScheduledProgram>,
    pub total_score: f64,
    pub average_score: f64,
}

// ============================================================================
// TESTS
// ============================================================================
