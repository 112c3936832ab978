//! Statements deriving the star schema from the staging tables.
//!
//! Each step is a single set-oriented `INSERT ... SELECT`; the steps run in
//! the order returned by [`insert_steps`].

use crate::config::TransformSettings;
use crate::schema::{ARTISTS_TABLE, SONGPLAYS_TABLE, SONGS_TABLE, TIME_TABLE, USERS_TABLE};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Page value marking an actual song play in the event log.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// `ts` (epoch milliseconds) as a timestamp, truncated to whole seconds.
const EPOCH_MILLIS_TO_TIMESTAMP: &str = "TIMESTAMP 'epoch' + ts / 1000 * INTERVAL '1 second'";

/// How the users dimension resolves users whose attributes change within
/// the staging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserPolicy {
    /// One row per user, with the attributes of the user's latest event.
    #[default]
    LatestLevel,
    /// Every distinct attribute combination; a level change yields two rows
    /// for the same user.
    Distinct,
}

impl UserPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "latest_level" => Some(UserPolicy::LatestLevel),
            "distinct" => Some(UserPolicy::Distinct),
            _ => None,
        }
    }
}

impl fmt::Display for UserPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserPolicy::LatestLevel => write!(f, "latest_level"),
            UserPolicy::Distinct => write!(f, "distinct"),
        }
    }
}

/// Which staging songs make it into the songs dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SongPolicy {
    /// Only songs matched by title to at least one play.
    #[default]
    PlayedOnly,
    /// Every staging song.
    All,
}

impl SongPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "played_only" => Some(SongPolicy::PlayedOnly),
            "all" => Some(SongPolicy::All),
            _ => None,
        }
    }
}

impl fmt::Display for SongPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongPolicy::PlayedOnly => write!(f, "played_only"),
            SongPolicy::All => write!(f, "all"),
        }
    }
}

/// How the artists dimension resolves an `artist_id` that appears with
/// different name, location or coordinates across song records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtistPolicy {
    /// One row per artist, preferring records with a location and
    /// coordinates.
    #[default]
    OnePerArtist,
    /// Every distinct attribute combination; a respelled location yields two
    /// rows for the same artist.
    Distinct,
}

impl ArtistPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "one_per_artist" => Some(ArtistPolicy::OnePerArtist),
            "distinct" => Some(ArtistPolicy::Distinct),
            _ => None,
        }
    }
}

impl fmt::Display for ArtistPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtistPolicy::OnePerArtist => write!(f, "one_per_artist"),
            ArtistPolicy::Distinct => write!(f, "distinct"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStep {
    pub name: &'static str,
    pub table: &'static str,
    pub sql: String,
}

pub fn insert_steps(settings: &TransformSettings) -> Vec<InsertStep> {
    vec![
        InsertStep {
            name: "songplays",
            table: SONGPLAYS_TABLE.name,
            sql: songplay_insert_sql(),
        },
        InsertStep {
            name: "users",
            table: USERS_TABLE.name,
            sql: user_insert_sql(settings.users),
        },
        InsertStep {
            name: "songs",
            table: SONGS_TABLE.name,
            sql: song_insert_sql(settings.songs),
        },
        InsertStep {
            name: "artists",
            table: ARTISTS_TABLE.name,
            sql: artist_insert_sql(settings.artists),
        },
        InsertStep {
            name: "time",
            table: TIME_TABLE.name,
            sql: time_insert_sql(),
        },
    ]
}

fn songplay_insert_sql() -> String {
    format!(
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second',
       se.user_id, se.level, ss.song_id, ss.artist_id, se.session_id, se.location, se.user_agent
FROM staging_events se
LEFT JOIN staging_songs ss ON se.song = ss.title
WHERE se.page = '{}';",
        NEXT_SONG_PAGE
    )
}

fn user_insert_sql(policy: UserPolicy) -> String {
    match policy {
        UserPolicy::LatestLevel => format!(
            "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT user_id, first_name, last_name, gender, level
FROM (
    SELECT user_id, first_name, last_name, gender, level,
           ROW_NUMBER() OVER (PARTITION BY user_id ORDER BY ts DESC, item_in_session DESC) AS recency
    FROM staging_events
    WHERE page = '{}' AND user_id IS NOT NULL
) latest
WHERE recency = 1;",
            NEXT_SONG_PAGE
        ),
        UserPolicy::Distinct => format!(
            "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT DISTINCT user_id, first_name, last_name, gender, level
FROM staging_events
WHERE page = '{}' AND user_id IS NOT NULL;",
            NEXT_SONG_PAGE
        ),
    }
}

fn song_insert_sql(policy: SongPolicy) -> String {
    match policy {
        SongPolicy::PlayedOnly => format!(
            "INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT DISTINCT ss.song_id, ss.title, ss.artist_id, ss.year, ss.duration
FROM staging_songs ss
JOIN staging_events se ON se.song = ss.title AND se.page = '{}';",
            NEXT_SONG_PAGE
        ),
        SongPolicy::All => "INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT DISTINCT song_id, title, artist_id, year, duration
FROM staging_songs;"
            .to_string(),
    }
}

fn artist_insert_sql(policy: ArtistPolicy) -> String {
    match policy {
        // Ties on the preference columns fall back to name and location so
        // the chosen row does not depend on scan order.
        ArtistPolicy::OnePerArtist => "INSERT INTO artists (artist_id, name, location, latitude, longitude)
SELECT artist_id, artist_name, artist_location, artist_latitude, artist_longitude
FROM (
    SELECT artist_id, artist_name, artist_location, artist_latitude, artist_longitude,
           ROW_NUMBER() OVER (
               PARTITION BY artist_id
               ORDER BY CASE WHEN artist_location IS NULL OR artist_location = '' THEN 1 ELSE 0 END,
                        CASE WHEN artist_latitude IS NULL OR artist_longitude IS NULL THEN 1 ELSE 0 END,
                        artist_name, artist_location, artist_latitude, artist_longitude
           ) AS preference
    FROM staging_songs
    WHERE artist_id IS NOT NULL
) ranked
WHERE preference = 1;"
            .to_string(),
        ArtistPolicy::Distinct => "INSERT INTO artists (artist_id, name, location, latitude, longitude)
SELECT DISTINCT artist_id, artist_name, artist_location, artist_latitude, artist_longitude
FROM staging_songs;"
            .to_string(),
    }
}

fn time_insert_sql() -> String {
    format!(
        "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
SELECT DISTINCT start_time,
       EXTRACT(hour FROM start_time),
       EXTRACT(day FROM start_time),
       EXTRACT(week FROM start_time),
       EXTRACT(month FROM start_time),
       EXTRACT(year FROM start_time),
       EXTRACT(dow FROM start_time)
FROM (
    SELECT {} AS start_time
    FROM staging_events
    WHERE page = '{}'
) plays;",
        EPOCH_MILLIS_TO_TIMESTAMP, NEXT_SONG_PAGE
    )
}

/// Same conversion the inserts apply to `ts`: whole seconds after the epoch,
/// UTC.
pub fn start_time_from_epoch_millis(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts / 1000, 0).map(|dt| dt.naive_utc())
}

/// Calendar fields stored in the time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub hour: u32,
    pub day: u32,
    /// ISO week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 0 = Sunday, as `EXTRACT(dow ...)` returns it.
    pub weekday: u32,
}

impl TimeParts {
    pub fn from_start_time(start_time: &NaiveDateTime) -> Self {
        Self {
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            weekday: start_time.weekday().num_days_from_sunday(),
        }
    }

    /// Start of the hour these parts describe.
    pub fn to_hour_start(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(self.hour, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_steps_in_fixed_order() {
        let names: Vec<_> = insert_steps(&TransformSettings::default())
            .into_iter()
            .map(|s| s.table)
            .collect();
        assert_eq!(names, vec!["songplays", "users", "songs", "artists", "time"]);
    }

    #[test]
    fn test_songplays_only_from_next_song_with_left_join() {
        let sql = songplay_insert_sql();
        assert!(sql.contains("WHERE se.page = 'NextSong'"));
        assert!(sql.contains("LEFT JOIN staging_songs ss ON se.song = ss.title"));
        assert!(sql.contains("TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second'"));
    }

    #[test]
    fn test_user_policies() {
        let latest = user_insert_sql(UserPolicy::LatestLevel);
        assert!(latest.contains("PARTITION BY user_id ORDER BY ts DESC, item_in_session DESC"));
        assert!(latest.contains("WHERE recency = 1"));

        let distinct = user_insert_sql(UserPolicy::Distinct);
        assert!(distinct.contains("SELECT DISTINCT user_id"));
        assert!(!distinct.contains("ROW_NUMBER"));

        for sql in [latest, distinct] {
            assert!(sql.contains("page = 'NextSong'"));
        }
    }

    #[test]
    fn test_song_policies() {
        let played = song_insert_sql(SongPolicy::PlayedOnly);
        assert!(played.contains("JOIN staging_events se ON se.song = ss.title"));
        assert!(!played.contains("LEFT JOIN"));

        let all = song_insert_sql(SongPolicy::All);
        assert!(!all.contains("staging_events"));
    }

    #[test]
    fn test_artist_policies() {
        let one_per_artist = artist_insert_sql(ArtistPolicy::OnePerArtist);
        assert!(one_per_artist.contains("PARTITION BY artist_id"));
        assert!(one_per_artist.contains("WHERE preference = 1"));
        assert!(one_per_artist.contains("WHERE artist_id IS NOT NULL"));

        let distinct = artist_insert_sql(ArtistPolicy::Distinct);
        assert!(distinct.contains("SELECT DISTINCT artist_id"));
        assert!(!distinct.contains("ROW_NUMBER"));

        // Artists come from every staging song, played or not.
        for sql in [one_per_artist, distinct] {
            assert!(sql.contains("FROM staging_songs"));
            assert!(!sql.contains("JOIN"));
        }
    }

    #[test]
    fn test_time_uses_same_epoch_conversion() {
        let sql = time_insert_sql();
        assert!(sql.contains(EPOCH_MILLIS_TO_TIMESTAMP));
        assert!(sql.contains("EXTRACT(dow FROM start_time)"));
        assert!(sql.contains("WHERE page = 'NextSong'"));
    }

    #[test]
    fn test_policy_parse_and_display() {
        for policy in [UserPolicy::LatestLevel, UserPolicy::Distinct] {
            assert_eq!(UserPolicy::parse(&policy.to_string()), Some(policy));
        }
        for policy in [ArtistPolicy::OnePerArtist, ArtistPolicy::Distinct] {
            assert_eq!(ArtistPolicy::parse(&policy.to_string()), Some(policy));
        }
        for policy in [SongPolicy::PlayedOnly, SongPolicy::All] {
            assert_eq!(SongPolicy::parse(&policy.to_string()), Some(policy));
        }
        assert_eq!(UserPolicy::parse("LATEST_LEVEL"), Some(UserPolicy::LatestLevel));
        assert_eq!(SongPolicy::parse("some"), None);
    }

    #[test]
    fn test_start_time_from_epoch_millis() {
        assert_eq!(
            start_time_from_epoch_millis(1541121934796),
            Some(datetime("2018-11-02 01:25:34"))
        );
        // Milliseconds are truncated, not rounded.
        assert_eq!(
            start_time_from_epoch_millis(999),
            Some(datetime("1970-01-01 00:00:00"))
        );
    }

    #[test]
    fn test_time_parts() {
        let parts = TimeParts::from_start_time(&datetime("2018-11-02 01:25:34"));
        assert_eq!(
            parts,
            TimeParts {
                hour: 1,
                day: 2,
                week: 44,
                month: 11,
                year: 2018,
                weekday: 5, // Friday
            }
        );
    }

    #[test]
    fn test_time_parts_round_trip() {
        for ts in [1541121934796_i64, 1543622400000, 1541030400000, 1543795199999] {
            let start_time = start_time_from_epoch_millis(ts).unwrap();
            let parts = TimeParts::from_start_time(&start_time);
            let hour_start = parts.to_hour_start().unwrap();
            assert_eq!(hour_start.date(), start_time.date());
            assert_eq!(hour_start.hour(), start_time.hour());
        }
    }
}
