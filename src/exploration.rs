//! Analytical queries run after a load, for reporting only.

use crate::warehouse::{Row, Warehouse, WarehouseError};
use tracing::info;

pub struct ExplorationQuery {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub sql: &'static str,
}

pub const TOP_SONGS_QUERY: ExplorationQuery = ExplorationQuery {
    name: "Top 10 most played songs",
    headers: &["title", "plays"],
    sql: "SELECT s.title, COUNT(*) AS plays
FROM songplays sp
JOIN songs s ON sp.song_id = s.song_id
GROUP BY s.song_id, s.title
ORDER BY plays DESC, s.title
LIMIT 10;",
};

pub const TOP_SONGS_BY_GENDER_QUERY: ExplorationQuery = ExplorationQuery {
    name: "Top 10 played songs by listener gender",
    headers: &["gender", "title", "plays"],
    sql: "SELECT u.gender, s.title, COUNT(*) AS plays
FROM songplays sp
JOIN songs s ON sp.song_id = s.song_id
JOIN users u ON sp.user_id = u.user_id
GROUP BY u.gender, s.title
ORDER BY plays DESC, u.gender, s.title
LIMIT 10;",
};

pub const EXPLORATION_QUERIES: &[ExplorationQuery] = &[TOP_SONGS_QUERY, TOP_SONGS_BY_GENDER_QUERY];

#[derive(Debug, Clone)]
pub struct ExplorationResult {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Row>,
}

pub async fn run_exploration(
    warehouse: &mut dyn Warehouse,
) -> Result<Vec<ExplorationResult>, WarehouseError> {
    let mut results = Vec::with_capacity(EXPLORATION_QUERIES.len());
    for query in EXPLORATION_QUERIES {
        info!("Executing exploration query: {}", query.name);
        let rows = warehouse.query(query.sql).await?;
        results.push(ExplorationResult {
            name: query.name,
            headers: query.headers,
            rows,
        });
    }
    Ok(results)
}
