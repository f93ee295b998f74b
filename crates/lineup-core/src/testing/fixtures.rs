/// Shared test fixtures: content, metadata, blocks and profiles.
use chrono::{NaiveDate, NaiveDateTime};

use crate::blocks::TimeBlock;
use crate::domain::{
    BlockCriteria, Content, ContentItem, ContentKind, ContentMeta, Profile, TimeBlockConfig,
};

pub fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

pub fn movie(id: &str, title: &str, minutes: i64) -> Content {
    Content {
        id: id.to_string(),
        external_key: format!("key-{id}"),
        title: title.to_string(),
        kind: ContentKind::Movie,
        duration_ms: minutes * 60_000,
        year: None,
        library_id: None,
    }
}

pub fn meta_with_genres(genres: &[&str]) -> ContentMeta {
    ContentMeta {
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..ContentMeta::default()
    }
}

pub fn item(id: &str, title: &str, minutes: i64, genres: &[&str]) -> ContentItem {
    ContentItem::new(movie(id, title, minutes), Some(meta_with_genres(genres)))
}

pub fn block_with_criteria(
    name: &str,
    start: &str,
    end: &str,
    criteria: BlockCriteria,
) -> TimeBlock {
    let config = TimeBlockConfig {
        name: name.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        criteria,
    };
    crate::blocks::TimeBlockSchedule::from_configs(std::slice::from_ref(&config))
        .blocks()[0]
        .clone()
}

/// A profile whose `time_blocks` contains the given block's definition.
pub fn profile_with_block(block: &TimeBlock) -> Profile {
    Profile {
        time_blocks: vec![TimeBlockConfig {
            name: block.name.clone(),
            start_time: block.start.format("%H:%M").to_string(),
            end_time: block.end.format("%H:%M").to_string(),
            criteria: block.criteria.clone(),
        }],
        ..Profile::default()
    }
}

/// A profile with a single all-day block and no criteria.
pub fn all_day_profile() -> Profile {
    profile_with_block(&block_with_criteria(
        "all_day",
        "00:00",
        "23:59",
        BlockCriteria::default(),
    ))
}
