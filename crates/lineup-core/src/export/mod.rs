/// CSV export of a scored playlist for audit in a spreadsheet.
use crate::domain::ScheduledProgram;

const CRITERION_COLUMNS: [&str; 9] = [
    "type", "duration", "genre", "timing", "strategy", "age", "rating", "filter", "bonus",
];

/// Quote a CSV field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render a scored playlist as CSV. Skipped criteria render as empty cells.
pub fn scoring_csv(programs: &[ScheduledProgram]) -> String {
    let mut lines = vec![
        "Position,Title,Start Time,Duration (min),Total Score,Type,Duration,Genre,Timing,\
         Strategy,Age,Rating,Filter,Bonus,Mandatory Met,Forbidden Violated"
            .to_string(),
    ];

    for program in programs {
        let mut fields = vec![
            program.position.to_string(),
            quote(&program.content.title),
            program.start_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
            format!("{:.1}", program.duration_minutes()),
            format!("{:.2}", program.score.total_score),
        ];

        for name in CRITERION_COLUMNS {
            let cell = program
                .score
                .criteria
                .get(name)
                .filter(|result| !result.skipped)
                .map(|result| format!("{:.2}", result.score))
                .unwrap_or_default();
            fields.push(cell);
        }

        fields.push(program.score.mandatory_met().to_string());
        fields.push(program.score.forbidden_violated().to_string());
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Profile;
    use crate::generator::Generator;
    use crate::testing::fixtures::{dt, item};

    fn three_program_playlist(profile: &Profile) -> Vec<ScheduledProgram> {
        let generator = Generator::new();
        let items = vec![
            (item("a", "First", 60, &["drama"]), dt(2025, 1, 10, 18, 0)),
            (item("b", "Middle", 60, &["drama"]), dt(2025, 1, 10, 19, 0)),
            (item("c", "Last", 60, &["drama"]), dt(2025, 1, 10, 20, 0)),
        ];
        generator.score_playlist(&items, profile).programs
    }

    #[test]
    fn test_header_and_row_shape() {
        let profile = crate::testing::fixtures::all_day_profile();
        let programs = three_program_playlist(&profile);
        let csv = scoring_csv(&programs);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Position,Title,Start Time"));
        assert!(lines[1].starts_with("0,\"First\",2025-01-10T18:00:00,60.0,"));
    }

    #[test]
    fn test_skipped_timing_cell_is_empty() {
        let mut profile = crate::testing::fixtures::all_day_profile();
        profile.scoring_weights.set("timing", 10.0);
        profile.scoring_weights.set("type", 10.0);
        for name in ["duration", "genre", "strategy", "age", "rating", "filter", "bonus"] {
            profile.scoring_weights.set(name, 0.0);
        }

        let programs = three_program_playlist(&profile);
        let csv = scoring_csv(&programs);
        let lines: Vec<&str> = csv.lines().collect();

        // Timing is the 9th column (0-based index 8)
        let middle_fields: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(middle_fields[8], "");

        let first_fields: Vec<&str> = lines[1].split(',').collect();
        assert!(!first_fields[8].is_empty());
        let last_fields: Vec<&str> = lines[3].split(',').collect();
        assert!(!last_fields[8].is_empty());

        // Total score renders with two decimals
        let total = first_fields[4];
        assert_eq!(total.split('.').nth(1).map(|d| d.len()), Some(2));
    }

    #[test]
    fn test_title_quoting_doubles_embedded_quotes() {
        let profile = crate::testing::fixtures::all_day_profile();
        let generator = Generator::new();
        let items = vec![(
            item("q", "Heat, the \"Director's\" Cut", 120, &["crime"]),
            dt(2025, 1, 10, 20, 0),
        )];
        let programs = generator.score_playlist(&items, &profile).programs;
        let csv = scoring_csv(&programs);
        assert!(csv.contains("\"Heat, the \"\"Director's\"\" Cut\""));
    }
}
