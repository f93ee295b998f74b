/// Time block schedule with midnight spanning support.
///
/// Blocks are `[start, end)` windows on the wall clock; a block whose end is
/// not after its start wraps past midnight. All datetimes here are naive
/// local wall-clock values: callers convert from a zoned instant exactly once
/// at the boundary so arithmetic stays stable across DST transitions.
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

use crate::domain::{BlockCriteria, Profile, TimeBlockConfig};

// ============================================================================
// TIME BLOCK
// ============================================================================

/// A parsed, runtime time block.
#[derive(Debug, Clone)]
pub struct TimeBlock {
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub criteria: BlockCriteria,
}

impl TimeBlock {
    /// True when the block wraps past midnight (end <= start).
    pub fn spans_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Block duration in minutes, honoring the midnight wrap.
    pub fn duration_minutes(&self) -> i64 {
        let start_min = minutes_of_day(self.start);
        let end_min = minutes_of_day(self.end);
        if self.spans_midnight() {
            (24 * 60 - start_min) + end_min
        } else {
            end_min - start_min
        }
    }

    /// Whether a time-of-day falls inside this block.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.spans_midnight() {
            t >= self.start || t < self.end
        } else {
            self.start <= t && t < self.end
        }
    }

    /// Hour of the block's start, used for time-of-day heuristics.
    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }
}

fn minutes_of_day(t: NaiveTime) -> i64 {
    t.hour() as i64 * 60 + t.minute() as i64
}

/// Parse an `HH:MM` string leniently; malformed input falls back to 00:00.
fn parse_hhmm(s: &str) -> NaiveTime {
    let mut parts = s.splitn(2, ':');
    let hour = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let minute = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    match (hour, minute) {
        (Some(h), Some(m)) if h < 24 && m < 60 => {
            NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
        }
        (Some(h), None) if h < 24 => NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default(),
        _ => NaiveTime::default(),
    }
}

// ============================================================================
// BLOCK SLOT
// ============================================================================

/// One contiguous slice of a block within an enumerated range.
#[derive(Debug, Clone)]
pub struct BlockSlot {
    pub block: TimeBlock,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BlockSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

// ============================================================================
// TIME BLOCK SCHEDULE
// ============================================================================

/// The profile's block set with lookup and enumeration operations.
#[derive(Debug, Clone, Default)]
pub struct TimeBlockSchedule {
    blocks: Vec<TimeBlock>,
}

impl TimeBlockSchedule {
    pub fn new(blocks: Vec<TimeBlock>) -> Self {
        Self { blocks }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self::from_configs(&profile.time_blocks)
    }

    pub fn from_configs(configs: &[TimeBlockConfig]) -> Self {
        let blocks = configs
            .iter()
            .map(|c| TimeBlock {
                name: c.name.clone(),
                start: parse_hhmm(&c.start_time),
                end: parse_hhmm(&c.end_time),
                criteria: c.criteria.clone(),
            })
            .collect();
        Self { blocks }
    }

    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    pub fn block_named(&self, name: &str) -> Option<&TimeBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Locate the block containing a wall-clock instant, honoring overnight
    /// wrap. First matching block wins when definitions overlap.
    pub fn locate(&self, dt: NaiveDateTime) -> Option<&TimeBlock> {
        self.blocks.iter().find(|b| b.contains(dt.time()))
    }

    /// Absolute start of the block *instance* containing `dt`. For an
    /// overnight block observed after midnight the start is yesterday.
    pub fn block_start(&self, dt: NaiveDateTime, block: &TimeBlock) -> NaiveDateTime {
        let date = if block.spans_midnight() && dt.time() < block.start {
            dt.date() - Duration::days(1)
        } else {
            dt.date()
        };
        date.and_time(block.start)
    }

    /// Absolute end of the block *instance* containing `dt`. For an
    /// overnight block observed before midnight the end is tomorrow.
    pub fn block_end(&self, dt: NaiveDateTime, block: &TimeBlock) -> NaiveDateTime {
        let date = if block.spans_midnight() && dt.time() >= block.start {
            dt.date() + Duration::days(1)
        } else {
            dt.date()
        };
        date.and_time(block.end)
    }

    /// Verify the blocks cover the full 24h day. Gaps are a warning surface,
    /// not a hard error; the generator simply skips uncovered minutes.
    pub fn validate_coverage(&self) -> (bool, Vec<String>) {
        if self.blocks.is_empty() {
            return (false, vec!["No blocks defined".to_string()]);
        }

        let mut covered = [false; 24 * 60];
        for block in &self.blocks {
            let start = minutes_of_day(block.start) as usize;
            let end = minutes_of_day(block.end) as usize;
            if block.spans_midnight() {
                for slot in covered.iter_mut().skip(start) {
                    *slot = true;
                }
                for slot in covered.iter_mut().take(end) {
                    *slot = true;
                }
            } else {
                for slot in covered.iter_mut().take(end).skip(start) {
                    *slot = true;
                }
            }
        }

        let mut gaps = Vec::new();
        let mut gap_start: Option<usize> = None;
        for (minute, is_covered) in covered.iter().enumerate() {
            match (is_covered, gap_start) {
                (false, None) => gap_start = Some(minute),
                (true, Some(start)) => {
                    gaps.push(format_gap(start, minute));
                    gap_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = gap_start {
            gaps.push(format!("Gap from {} to 24:00", format_minute(start)));
        }

        (gaps.is_empty(), gaps)
    }

    /// Partition `[start, start + duration_hours)` into consecutive
    /// `(block, slice_start, slice_end)` slots. Uncovered minutes are skipped.
    pub fn enumerate_slots(&self, start: NaiveDateTime, duration_hours: i64) -> Vec<BlockSlot> {
        let range_end = start + Duration::hours(duration_hours);
        let mut slots = Vec::new();
        let mut current = start;

        while current < range_end {
            match self.locate(current) {
                Some(block) => {
                    let block_end = self.block_end(current, block);
                    let slot_end = block_end.min(range_end);
                    slots.push(BlockSlot {
                        block: block.clone(),
                        start: current,
                        end: slot_end,
                    });
                    current = slot_end;
                }
                None => {
                    current += Duration::minutes(1);
                }
            }
        }

        slots
    }
}

fn format_minute(m: usize) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}

fn format_gap(start: usize, end: usize) -> String {
    format!("Gap from {} to {}", format_minute(start), format_minute(end))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn block(name: &str, start: &str, end: &str) -> TimeBlockConfig {
        TimeBlockConfig {
            name: name.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            criteria: BlockCriteria::default(),
        }
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_hhmm_lenient() {
        assert_eq!(parse_hhmm("22:30"), NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(parse_hhmm("7"), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(parse_hhmm("garbage"), NaiveTime::default());
        assert_eq!(parse_hhmm("25:99"), NaiveTime::default());
    }

    #[test]
    fn test_overnight_block_duration_and_containment() {
        let schedule = TimeBlockSchedule::from_configs(&[block("late", "22:00", "02:00")]);
        let late = &schedule.blocks()[0];

        assert!(late.spans_midnight());
        assert_eq!(late.duration_minutes(), 240);

        // 22:00-02:00 contains 23:30 and 01:30, not 02:00 or 12:00
        assert!(late.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(late.contains(NaiveTime::from_hms_opt(1, 30, 0).unwrap()));
        assert!(!late.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!late.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn test_midnight_span_instance_boundaries() {
        let schedule = TimeBlockSchedule::from_configs(&[block("late", "22:00", "02:00")]);
        let late = schedule.block_named("late").unwrap();

        // Before midnight: end is next calendar day at 02:00
        let before = dt(2025, 1, 10, 23, 30);
        assert_eq!(schedule.block_end(before, late), dt(2025, 1, 11, 2, 0));
        assert_eq!(schedule.block_start(before, late), dt(2025, 1, 10, 22, 0));

        // After midnight: start is the previous day at 22:00
        let after = dt(2025, 1, 11, 1, 30);
        assert_eq!(schedule.block_start(after, late), dt(2025, 1, 10, 22, 0));
        assert_eq!(schedule.block_end(after, late), dt(2025, 1, 11, 2, 0));
    }

    #[test]
    fn test_locate_daytime_blocks() {
        let schedule = TimeBlockSchedule::from_configs(&[
            block("morning", "06:00", "12:00"),
            block("afternoon", "12:00", "18:00"),
        ]);

        assert_eq!(
            schedule.locate(dt(2025, 3, 1, 9, 0)).map(|b| b.name.as_str()),
            Some("morning")
        );
        // Boundary belongs to the following block
        assert_eq!(
            schedule.locate(dt(2025, 3, 1, 12, 0)).map(|b| b.name.as_str()),
            Some("afternoon")
        );
        assert!(schedule.locate(dt(2025, 3, 1, 3, 0)).is_none());
    }

    #[test]
    fn test_validate_coverage_reports_gaps() {
        let full = TimeBlockSchedule::from_configs(&[
            block("day", "06:00", "22:00"),
            block("night", "22:00", "06:00"),
        ]);
        let (ok, gaps) = full.validate_coverage();
        assert!(ok, "unexpected gaps: {:?}", gaps);

        let holey = TimeBlockSchedule::from_configs(&[block("day", "06:00", "22:00")]);
        let (ok, gaps) = holey.validate_coverage();
        assert!(!ok);
        assert_eq!(gaps.len(), 2);
        assert!(gaps[0].contains("00:00"));
        assert!(gaps[1].contains("24:00"));
    }

    #[test]
    fn test_enumerate_slots_across_midnight() {
        let schedule = TimeBlockSchedule::from_configs(&[
            block("evening", "18:00", "22:00"),
            block("late", "22:00", "02:00"),
            block("rest", "02:00", "18:00"),
        ]);

        let slots = schedule.enumerate_slots(dt(2025, 1, 10, 20, 0), 8);
        assert_eq!(slots.len(), 3);

        assert_eq!(slots[0].block.name, "evening");
        assert_eq!(slots[0].end, dt(2025, 1, 10, 22, 0));

        assert_eq!(slots[1].block.name, "late");
        assert_eq!(slots[1].start, dt(2025, 1, 10, 22, 0));
        assert_eq!(slots[1].end, dt(2025, 1, 11, 2, 0));

        assert_eq!(slots[2].block.name, "rest");
        assert_eq!(slots[2].end, dt(2025, 1, 11, 4, 0));

        let total: i64 = slots.iter().map(|s| s.duration_minutes()).sum();
        assert_eq!(total, 8 * 60);
    }

    #[test]
    fn test_enumerate_slots_skips_uncovered_minutes() {
        let schedule = TimeBlockSchedule::from_configs(&[block("prime", "20:00", "21:00")]);
        let slots = schedule.enumerate_slots(dt(2025, 1, 10, 19, 30), 2);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, dt(2025, 1, 10, 20, 0));
        assert_eq!(slots[0].end, dt(2025, 1, 10, 21, 0));
    }
}
