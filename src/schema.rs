//! Table definitions for the Sparkify warehouse.
//!
//! Two staging tables receive the raw JSON records; the star schema (one
//! fact table, four dimensions) is derived from them by the transform stage.

use crate::warehouse_column;
use crate::warehouse_persistence::{Column, DistStyle, SqlType, Table, WarehouseSchema};

// =============================================================================
// Staging
// =============================================================================

/// One row per raw log line. Column order follows the JSON path manifest.
pub const STAGING_EVENTS_TABLE: Table = Table {
    name: "staging_events",
    columns: &[
        warehouse_column!("artist", &SqlType::Varchar(512)),
        warehouse_column!("auth", &SqlType::Varchar(32)),
        warehouse_column!("first_name", &SqlType::Varchar(256)),
        warehouse_column!("gender", &SqlType::Varchar(8)),
        warehouse_column!("item_in_session", &SqlType::Integer),
        warehouse_column!("last_name", &SqlType::Varchar(256)),
        warehouse_column!("length", &SqlType::Double),
        warehouse_column!("level", &SqlType::Varchar(16)),
        warehouse_column!("location", &SqlType::Varchar(512)),
        warehouse_column!("method", &SqlType::Varchar(8)),
        warehouse_column!("page", &SqlType::Varchar(32)),
        warehouse_column!("registration", &SqlType::BigInt),
        warehouse_column!("session_id", &SqlType::Integer),
        warehouse_column!("song", &SqlType::Varchar(512)),
        warehouse_column!("status", &SqlType::SmallInt),
        warehouse_column!("ts", &SqlType::BigInt), // epoch millis
        warehouse_column!("user_agent", &SqlType::Varchar(512)),
        warehouse_column!("user_id", &SqlType::Integer),
    ],
    dist_style: DistStyle::Auto,
};

/// One row per song metadata record. Columns are named after the JSON keys
/// so the bulk load can map them automatically.
pub const STAGING_SONGS_TABLE: Table = Table {
    name: "staging_songs",
    columns: &[
        warehouse_column!("num_songs", &SqlType::Integer),
        warehouse_column!("artist_id", &SqlType::Varchar(32)),
        warehouse_column!("artist_latitude", &SqlType::Double),
        warehouse_column!("artist_longitude", &SqlType::Double),
        warehouse_column!("artist_location", &SqlType::Varchar(512)),
        warehouse_column!("artist_name", &SqlType::Varchar(512)),
        warehouse_column!("song_id", &SqlType::Varchar(32)),
        warehouse_column!("title", &SqlType::Varchar(512)),
        warehouse_column!("duration", &SqlType::Double),
        warehouse_column!("year", &SqlType::SmallInt),
    ],
    dist_style: DistStyle::Auto,
};

// =============================================================================
// Star schema
// =============================================================================

/// Fact table, one row per `NextSong` event.
pub const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        warehouse_column!("songplay_id", &SqlType::Integer, is_identity = true),
        warehouse_column!(
            "start_time",
            &SqlType::Timestamp,
            non_null = true,
            is_sort_key = true
        ),
        warehouse_column!("user_id", &SqlType::Integer, non_null = true),
        warehouse_column!("level", &SqlType::Varchar(16)),
        warehouse_column!("song_id", &SqlType::Varchar(32), is_dist_key = true), // null on no title match
        warehouse_column!("artist_id", &SqlType::Varchar(32)),
        warehouse_column!("session_id", &SqlType::Integer),
        warehouse_column!("location", &SqlType::Varchar(512)),
        warehouse_column!("user_agent", &SqlType::Varchar(512)),
    ],
    dist_style: DistStyle::Auto,
};

pub const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        warehouse_column!("user_id", &SqlType::Integer, is_primary_key = true, non_null = true),
        warehouse_column!("first_name", &SqlType::Varchar(256)),
        warehouse_column!("last_name", &SqlType::Varchar(256)),
        warehouse_column!("gender", &SqlType::Varchar(8)),
        warehouse_column!("level", &SqlType::Varchar(16)),
    ],
    dist_style: DistStyle::All,
};

pub const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        warehouse_column!(
            "song_id",
            &SqlType::Varchar(32),
            is_primary_key = true,
            non_null = true,
            is_dist_key = true,
            is_sort_key = true
        ),
        warehouse_column!("title", &SqlType::Varchar(512)),
        warehouse_column!("artist_id", &SqlType::Varchar(32)),
        warehouse_column!("year", &SqlType::SmallInt),
        warehouse_column!("duration", &SqlType::Double),
    ],
    dist_style: DistStyle::Auto,
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        warehouse_column!("artist_id", &SqlType::Varchar(32), is_primary_key = true, non_null = true),
        warehouse_column!("name", &SqlType::Varchar(512)),
        warehouse_column!("location", &SqlType::Varchar(512)),
        warehouse_column!("latitude", &SqlType::Double),
        warehouse_column!("longitude", &SqlType::Double),
    ],
    dist_style: DistStyle::All,
};

pub const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        warehouse_column!("time_id", &SqlType::Integer, is_identity = true),
        warehouse_column!(
            "start_time",
            &SqlType::Timestamp,
            non_null = true,
            is_sort_key = true
        ),
        warehouse_column!("hour", &SqlType::SmallInt),
        warehouse_column!("day", &SqlType::SmallInt),
        warehouse_column!("week", &SqlType::SmallInt),
        warehouse_column!("month", &SqlType::SmallInt),
        warehouse_column!("year", &SqlType::SmallInt),
        warehouse_column!("weekday", &SqlType::SmallInt),
    ],
    dist_style: DistStyle::All,
};

// =============================================================================
// Schema
// =============================================================================

pub const STAGING_SCHEMA: WarehouseSchema = WarehouseSchema {
    tables: &[&STAGING_EVENTS_TABLE, &STAGING_SONGS_TABLE],
};

pub const STAR_SCHEMA: WarehouseSchema = WarehouseSchema {
    tables: &[
        &USERS_TABLE,
        &SONGS_TABLE,
        &ARTISTS_TABLE,
        &TIME_TABLE,
        &SONGPLAYS_TABLE,
    ],
};

/// Every table, in creation order: staging first, dimensions before the fact
/// table that refers to them.
pub const SPARKIFY_SCHEMA: WarehouseSchema = WarehouseSchema {
    tables: &[
        &STAGING_EVENTS_TABLE,
        &STAGING_SONGS_TABLE,
        &USERS_TABLE,
        &SONGS_TABLE,
        &ARTISTS_TABLE,
        &TIME_TABLE,
        &SONGPLAYS_TABLE,
    ],
};
