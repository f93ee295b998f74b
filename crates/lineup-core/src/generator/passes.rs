/// Post-generation mutation passes over the best iteration.
///
/// Both passes are best-effort: when no replacement can be made they return
/// the input result unchanged (flags unset) rather than failing.
use std::collections::{HashMap, HashSet};

use chrono::Duration;
use rand::rngs::StdRng;

use crate::blocks::TimeBlockSchedule;
use crate::domain::{
    ContentItem, Profile, ProgrammingResult, ReplacementReason, ScheduledProgram,
};
use crate::generator::postprocess::{
    recalculate_block_names, recalculate_consecutive_timings, recalculate_full_scores,
    recalculate_timing_scores,
};
use crate::generator::prefilter::prefilter_for_block;
use crate::generator::select_weighted_index;
use crate::scoring::{ScoringContext, ScoringEngine};

/// Map of block name to candidate programs from the other iterations,
/// best score first.
fn alternatives_by_block(
    best: &ProgrammingResult,
    all_results: &[ProgrammingResult],
    exclude_forbidden: bool,
) -> HashMap<String, Vec<(ScheduledProgram, u32)>> {
    let mut map: HashMap<String, Vec<(ScheduledProgram, u32)>> = HashMap::new();
    for result in all_results {
        if result.iteration == best.iteration {
            continue;
        }
        for program in &result.programs {
            if exclude_forbidden && program.is_forbidden() {
                continue;
            }
            map.entry(program.block_name.clone())
                .or_default()
                .push((program.clone(), result.iteration));
        }
    }
    for candidates in map.values_mut() {
        candidates.sort_by(|a, b| {
            b.0.score
                .total_score
                .partial_cmp(&a.0.score.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    map
}

fn used_ids(programs: &[ScheduledProgram]) -> HashSet<String> {
    programs.iter().map(|p| p.content.id.clone()).collect()
}

fn replacement_from(
    alt: &ScheduledProgram,
    slot: &ScheduledProgram,
    reason: ReplacementReason,
) -> ScheduledProgram {
    ScheduledProgram {
        content: alt.content.clone(),
        meta: alt.meta.clone(),
        start_time: slot.start_time,
        end_time: slot.start_time + Duration::milliseconds(alt.content.duration_ms),
        block_name: slot.block_name.clone(),
        position: slot.position,
        score: alt.score.clone(),
        is_replacement: true,
        replacement_reason: Some(reason),
        replaced_title: Some(slot.content.title.clone()),
    }
}

fn finalize_pass(
    mut programs: Vec<ScheduledProgram>,
    profile: &Profile,
    schedule: &TimeBlockSchedule,
    engine: &ScoringEngine,
) -> Vec<ScheduledProgram> {
    // Durations changed, so times shift; then realized-time blocks, full
    // scores against the new blocks, and finally first/last timing
    recalculate_consecutive_timings(&mut programs);
    recalculate_block_names(&mut programs, schedule);
    recalculate_full_scores(&mut programs, profile, schedule, engine);
    recalculate_timing_scores(&mut programs, profile, schedule);
    programs
}

fn totals(programs: &[ScheduledProgram]) -> (f64, f64, usize) {
    let total: f64 = programs.iter().map(|p| p.score.total_score).sum();
    let average = if programs.is_empty() {
        0.0
    } else {
        total / programs.len() as f64
    };
    let forbidden = programs.iter().filter(|p| p.is_forbidden()).count();
    (total, average, forbidden)
}

/// Swap programs in the best iteration for strictly better-scoring,
/// non-forbidden, unused candidates from other iterations in the same block.
pub fn improve_best_programs(
    best: &ProgrammingResult,
    all_results: &[ProgrammingResult],
    randomness: f64,
    profile: &Profile,
    schedule: &TimeBlockSchedule,
    engine: &ScoringEngine,
    iteration_number: u32,
    rng: &mut StdRng,
) -> ProgrammingResult {
    let alternatives = alternatives_by_block(best, all_results, false);
    let mut used = used_ids(&best.programs);

    let mut new_programs = best.programs.clone();
    let mut improved_count = 0usize;

    for (idx, current) in best.programs.iter().enumerate() {
        let Some(block_candidates) = alternatives.get(&current.block_name) else {
            continue;
        };
        let current_score = current.score.total_score;

        let candidates: Vec<&(ScheduledProgram, u32)> = block_candidates
            .iter()
            .filter(|(alt, _)| {
                alt.score.total_score > current_score
                    && !alt.is_forbidden()
                    && !used.contains(&alt.content.id)
            })
            .collect();
        if candidates.is_empty() {
            continue;
        }

        let scores: Vec<f64> = candidates
            .iter()
            .map(|(alt, _)| alt.score.total_score)
            .collect();
        let selected = select_weighted_index(&scores, randomness, rng);
        let (alt, source_iteration) = candidates[selected];

        tracing::info!(
            replaced = %current.content.title,
            with = %alt.content.title,
            from_iteration = source_iteration,
            old_score = current_score,
            new_score = alt.score.total_score,
            "improved program"
        );

        used.insert(alt.content.id.clone());
        used.remove(&current.content.id);
        new_programs[idx] = replacement_from(alt, current, ReplacementReason::Improved);
        improved_count += 1;
    }

    if improved_count == 0 {
        tracing::info!("no improvements possible");
        return best.clone();
    }

    let new_programs = finalize_pass(new_programs, profile, schedule, engine);
    let (total_score, average_score, forbidden_count) = totals(&new_programs);

    ProgrammingResult {
        programs: new_programs,
        total_score,
        average_score,
        iteration: iteration_number,
        forbidden_count,
        seed: best.seed,
        all_iterations: Vec::new(),
        is_optimized: false,
        is_improved: true,
        original_best_iteration: 0,
        original_best_score: 0.0,
        replaced_count: 0,
        improved_count,
    }
}

/// Replace forbidden programs in the best iteration: first from other
/// iterations (same block, unused, non-forbidden), then from the block's
/// pre-filtered pool rescored at the original slot time.
#[allow(clippy::too_many_arguments)]
pub fn replace_forbidden_programs(
    best: &ProgrammingResult,
    all_results: &[ProgrammingResult],
    pool: &[ContentItem],
    profile: &Profile,
    schedule: &TimeBlockSchedule,
    engine: &ScoringEngine,
    iteration_number: u32,
    reference_year: i32,
) -> ProgrammingResult {
    let forbidden_indices: Vec<usize> = best
        .programs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_forbidden())
        .map(|(idx, _)| idx)
        .collect();

    if forbidden_indices.is_empty() {
        tracing::info!("no forbidden programs to replace");
        return best.clone();
    }
    tracing::info!(count = forbidden_indices.len(), "replacing forbidden programs");

    let alternatives = alternatives_by_block(best, all_results, true);
    let mut used = used_ids(&best.programs);

    let mut new_programs = best.programs.clone();
    let mut replaced_count = 0usize;

    for idx in forbidden_indices {
        let slot = new_programs[idx].clone();
        let forbidden_id = slot.content.id.clone();
        let mut replacement: Option<ScheduledProgram> = None;

        // Strategy 1: candidate from another iteration, same block
        if let Some(candidates) = alternatives.get(&slot.block_name) {
            for (alt, source_iteration) in candidates {
                if !used.contains(&alt.content.id) {
                    tracing::info!(
                        replaced = %slot.content.title,
                        with = %alt.content.title,
                        from_iteration = source_iteration,
                        "replaced forbidden program from another iteration"
                    );
                    used.insert(alt.content.id.clone());
                    replacement =
                        Some(replacement_from(alt, &slot, ReplacementReason::Forbidden));
                    break;
                }
            }
        }

        // Strategy 2: highest-scoring non-forbidden item from the block's
        // pre-filtered pool, rescored at the original slot time
        if replacement.is_none() {
            if let Some(block) = schedule.block_named(&slot.block_name) {
                let block_filtered = prefilter_for_block(pool, block, reference_year);
                for item in &block_filtered {
                    if used.contains(&item.content.id) {
                        continue;
                    }
                    let located = schedule.locate(slot.start_time);
                    let ctx = ScoringContext {
                        current_time: Some(slot.start_time),
                        block_start: located
                            .map(|b| schedule.block_start(slot.start_time, b)),
                        block_end: located.map(|b| schedule.block_end(slot.start_time, b)),
                        is_first_in_block: idx == 0
                            || new_programs[idx - 1].block_name != slot.block_name,
                        is_last_in_block: false,
                        is_schedule_start: idx == 0,
                    };
                    let score = engine.score(
                        &item.content,
                        item.meta.as_ref(),
                        profile,
                        located,
                        Some(&ctx),
                    );
                    if score.forbidden_violations.is_empty() {
                        tracing::info!(
                            replaced = %slot.content.title,
                            with = %item.content.title,
                            "replaced forbidden program from pre-filtered pool"
                        );
                        used.insert(item.content.id.clone());
                        let candidate = ScheduledProgram {
                            content: item.content.clone(),
                            meta: item.meta.clone(),
                            start_time: slot.start_time,
                            end_time: slot.start_time
                                + Duration::milliseconds(item.content.duration_ms),
                            block_name: slot.block_name.clone(),
                            position: slot.position,
                            score,
                            is_replacement: true,
                            replacement_reason: Some(ReplacementReason::Forbidden),
                            replaced_title: Some(slot.content.title.clone()),
                        };
                        replacement = Some(candidate);
                        break;
                    }
                }
            }
        }

        match replacement {
            Some(replacement) => {
                new_programs[idx] = replacement;
                used.remove(&forbidden_id);
                replaced_count += 1;
            }
            None => {
                tracing::warn!(
                    title = %slot.content.title,
                    block = %slot.block_name,
                    "no replacement found for forbidden program"
                );
            }
        }
    }

    if replaced_count == 0 {
        return best.clone();
    }

    let new_programs = finalize_pass(new_programs, profile, schedule, engine);
    let (total_score, average_score, forbidden_count) = totals(&new_programs);

    ProgrammingResult {
        programs: new_programs,
        total_score,
        average_score,
        iteration: iteration_number,
        forbidden_count,
        seed: best.seed,
        all_iterations: Vec::new(),
        is_optimized: true,
        is_improved: false,
        original_best_iteration: 0,
        original_best_score: 0.0,
        replaced_count,
        improved_count: 0,
    }
}
