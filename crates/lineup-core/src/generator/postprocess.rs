/// Schedule post-processing.
///
/// Realized start times are canonical: after assembly (and after every
/// replacement pass) block names are recomputed from each program's actual
/// start, scores are refreshed against the new block's criteria where
/// needed, and the timing criterion is re-evaluated per block *instance*
/// with proper first/last flags. Interior programs get a skipped timing
/// result whose weight leaves the weighted-total denominator.
use chrono::Duration;

use crate::blocks::TimeBlockSchedule;
use crate::domain::{Profile, ScheduledProgram};
use crate::scoring::criteria::{Criterion, TimingCriterion};
use crate::scoring::{CriterionResult, ScoringContext, ScoringEngine};

/// Reassign each program's `block_name` from its realized start time.
/// Returns the number of changes.
pub fn recalculate_block_names(
    programs: &mut [ScheduledProgram],
    schedule: &TimeBlockSchedule,
) -> usize {
    let mut changes = 0;
    for program in programs.iter_mut() {
        let new_name = schedule
            .locate(program.start_time)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        if program.block_name != new_name {
            tracing::debug!(
                title = %program.content.title,
                from = %program.block_name,
                to = %new_name,
                "block reassignment from realized start time"
            );
            program.block_name = new_name;
            changes += 1;
        }
    }
    changes
}

/// Group program indices into block instances. A new instance starts when
/// the block name changes or when the start time jumps backward more than an
/// hour from the previous program's end (multi-day wraparound), so same-named
/// blocks on different days never merge.
pub fn group_block_instances(programs: &[ScheduledProgram]) -> Vec<Vec<usize>> {
    let mut instances: Vec<Vec<usize>> = Vec::new();

    for (idx, program) in programs.iter().enumerate() {
        let is_new_instance = match instances.last() {
            None => true,
            Some(current) => {
                let prev = &programs[*current.last().expect("instance never empty")];
                program.block_name != prev.block_name
                    || program.start_time < prev.end_time - Duration::hours(1)
            }
        };

        if is_new_instance {
            instances.push(vec![idx]);
        } else {
            instances.last_mut().expect("instance exists").push(idx);
        }
    }

    instances
}

/// Re-evaluate the timing criterion for the first and last program of every
/// block instance and mark interior programs as skipped, then refresh each
/// touched program's totals.
pub fn recalculate_timing_scores(
    programs: &mut [ScheduledProgram],
    profile: &Profile,
    schedule: &TimeBlockSchedule,
) {
    if programs.is_empty() {
        return;
    }
    let timing = TimingCriterion;

    for indices in group_block_instances(programs) {
        let first_idx = indices[0];
        let last_idx = *indices.last().expect("instance never empty");
        let block = schedule.block_named(&programs[first_idx].block_name).cloned();

        if let Some(block) = &block {
            // First program: late-start applies; it may also be the last
            let first = &programs[first_idx];
            let ctx = ScoringContext {
                current_time: Some(first.start_time),
                block_start: Some(schedule.block_start(first.start_time, block)),
                block_end: Some(schedule.block_end(first.start_time, block)),
                is_first_in_block: true,
                is_last_in_block: first_idx == last_idx,
                is_schedule_start: first_idx == 0,
            };
            let result = timing.evaluate(
                &first.content,
                first.meta.as_ref(),
                profile,
                Some(block),
                Some(&ctx),
            );
            update_program_timing(&mut programs[first_idx], result);

            if last_idx != first_idx {
                let last = &programs[last_idx];
                let ctx = ScoringContext {
                    current_time: Some(last.start_time),
                    block_start: Some(schedule.block_start(last.start_time, block)),
                    block_end: Some(schedule.block_end(last.start_time, block)),
                    is_first_in_block: false,
                    is_last_in_block: true,
                    is_schedule_start: false,
                };
                let result = timing.evaluate(
                    &last.content,
                    last.meta.as_ref(),
                    profile,
                    Some(block),
                    Some(&ctx),
                );
                update_program_timing(&mut programs[last_idx], result);
            }
        }

        // Interior programs never carry a timing weight
        for &idx in indices.iter().skip(1).take(indices.len().saturating_sub(2)) {
            update_program_timing(&mut programs[idx], CriterionResult::skipped("timing"));
        }
    }
}

/// Swap in a new timing result and recompute the program's totals with the
/// engine's formula (mandatory penalties and keyword multiplier re-applied).
pub fn update_program_timing(program: &mut ScheduledProgram, timing: CriterionResult) {
    program.score.criteria.insert("timing".to_string(), timing);
    ScoringEngine::refresh_totals(&mut program.score);
}

/// After replacements, make programs consecutive again: the first keeps its
/// start, each later one starts when its predecessor ends.
pub fn recalculate_consecutive_timings(programs: &mut [ScheduledProgram]) {
    for idx in 0..programs.len() {
        let duration = Duration::milliseconds(programs[idx].content.duration_ms);
        if idx == 0 {
            programs[idx].end_time = programs[idx].start_time + duration;
        } else {
            let prev_end = programs[idx - 1].end_time;
            programs[idx].start_time = prev_end;
            programs[idx].end_time = prev_end + duration;
        }
    }
}

/// Rescore every program against its (possibly new) block's criteria so
/// forbidden outcomes from the new block are visible to later passes.
pub fn recalculate_full_scores(
    programs: &mut [ScheduledProgram],
    profile: &Profile,
    schedule: &TimeBlockSchedule,
    engine: &ScoringEngine,
) {
    for idx in 0..programs.len() {
        let block = schedule.block_named(&programs[idx].block_name).cloned();
        let start_time = programs[idx].start_time;

        let ctx = ScoringContext {
            current_time: Some(start_time),
            block_start: block.as_ref().map(|b| schedule.block_start(start_time, b)),
            block_end: block.as_ref().map(|b| schedule.block_end(start_time, b)),
            is_first_in_block: idx == 0,
            is_last_in_block: false,
            is_schedule_start: idx == 0,
        };

        let was_forbidden = programs[idx].is_forbidden();
        let new_score = engine.score(
            &programs[idx].content,
            programs[idx].meta.as_ref(),
            profile,
            block.as_ref(),
            Some(&ctx),
        );
        if new_score.forbidden_violations.is_empty() == was_forbidden {
            tracing::debug!(
                title = %programs[idx].content.title,
                block = %programs[idx].block_name,
                now_forbidden = !new_score.forbidden_violations.is_empty(),
                "forbidden status changed during rescore"
            );
        }
        programs[idx].score = new_score;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockCriteria, ContentItem, Profile};
    use crate::testing::fixtures::{dt, item, profile_with_block};

    fn program(
        item: &ContentItem,
        start: chrono::NaiveDateTime,
        block_name: &str,
        position: usize,
        profile: &Profile,
        schedule: &TimeBlockSchedule,
    ) -> ScheduledProgram {
        let engine = ScoringEngine::new();
        let block = schedule.block_named(block_name).cloned();
        let score = engine.score(
            &item.content,
            item.meta.as_ref(),
            profile,
            block.as_ref(),
            None,
        );
        ScheduledProgram {
            content: item.content.clone(),
            meta: item.meta.clone(),
            start_time: start,
            end_time: start + Duration::milliseconds(item.content.duration_ms),
            block_name: block_name.to_string(),
            position,
            score,
            is_replacement: false,
            replacement_reason: None,
            replaced_title: None,
        }
    }

    fn three_program_setup() -> (Vec<ScheduledProgram>, Profile, TimeBlockSchedule) {
        let block = crate::testing::fixtures::block_with_criteria(
            "evening",
            "18:00",
            "23:59",
            BlockCriteria::default(),
        );
        let profile = profile_with_block(&block);
        let schedule = TimeBlockSchedule::from_profile(&profile);

        let a = item("a", "First", 60, &["drama"]);
        let b = item("b", "Middle", 60, &["drama"]);
        let c = item("c", "Last", 60, &["drama"]);

        let programs = vec![
            program(&a, dt(2025, 1, 10, 18, 0), "evening", 0, &profile, &schedule),
            program(&b, dt(2025, 1, 10, 19, 0), "evening", 1, &profile, &schedule),
            program(&c, dt(2025, 1, 10, 20, 0), "evening", 2, &profile, &schedule),
        ];
        (programs, profile, schedule)
    }

    #[test]
    fn test_middle_program_timing_is_skipped() {
        let (mut programs, profile, schedule) = three_program_setup();
        recalculate_timing_scores(&mut programs, &profile, &schedule);

        assert!(!programs[0].score.criteria["timing"].skipped);
        assert!(programs[1].score.criteria["timing"].skipped);
        assert!(!programs[2].score.criteria["timing"].skipped);
    }

    #[test]
    fn test_skipped_timing_weight_leaves_denominator() {
        // Doubling the timing weight must not move the middle program's
        // weighted total once its timing result is skipped
        let (mut programs, mut profile, schedule) = three_program_setup();
        recalculate_timing_scores(&mut programs, &profile, &schedule);
        let baseline = programs[1].score.weighted_total;

        profile.scoring_weights.set("timing", 40.0);
        let (mut programs2, _, _) = three_program_setup();
        // Rescore with doubled weight, then re-run the timing pass
        let engine = ScoringEngine::new();
        recalculate_full_scores(&mut programs2, &profile, &schedule, &engine);
        recalculate_timing_scores(&mut programs2, &profile, &schedule);

        assert!((programs2[1].score.weighted_total - baseline).abs() < 1e-9);
    }

    #[test]
    fn test_block_instance_split_on_backward_jump() {
        let (mut programs, _, _) = three_program_setup();
        // Same block name, but the third program starts a day earlier than
        // the second ended minus an hour: a new instance
        programs[2].start_time = dt(2025, 1, 10, 18, 0) - Duration::hours(20);
        programs[2].end_time = programs[2].start_time + Duration::hours(1);

        let instances = group_block_instances(&programs);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0], vec![0, 1]);
        assert_eq!(instances[1], vec![2]);
    }

    #[test]
    fn test_recalculate_consecutive_timings_closes_gaps() {
        let (mut programs, _, _) = three_program_setup();
        // Replace the middle program with a shorter one, leaving a gap
        programs[1].content.duration_ms = 30 * 60_000;

        recalculate_consecutive_timings(&mut programs);

        assert_eq!(programs[0].end_time, programs[1].start_time);
        assert_eq!(programs[1].end_time, programs[1].start_time + Duration::minutes(30));
        assert_eq!(programs[2].start_time, programs[1].end_time);
    }

    #[test]
    fn test_recalculate_block_names_follows_realized_start() {
        let block_a = crate::testing::fixtures::block_with_criteria(
            "afternoon",
            "12:00",
            "18:00",
            BlockCriteria::default(),
        );
        let block_b = crate::testing::fixtures::block_with_criteria(
            "evening",
            "18:00",
            "23:59",
            BlockCriteria::default(),
        );
        let mut profile = profile_with_block(&block_a);
        profile.time_blocks.push(crate::domain::TimeBlockConfig {
            name: block_b.name.clone(),
            start_time: "18:00".to_string(),
            end_time: "23:59".to_string(),
            criteria: BlockCriteria::default(),
        });
        let schedule = TimeBlockSchedule::from_profile(&profile);

        let a = item("a", "Shifted", 60, &["drama"]);
        let mut programs = vec![program(
            &a,
            dt(2025, 1, 10, 18, 30),
            "afternoon",
            0,
            &profile,
            &schedule,
        )];

        let changes = recalculate_block_names(&mut programs, &schedule);
        assert_eq!(changes, 1);
        assert_eq!(programs[0].block_name, "evening");
    }
}
