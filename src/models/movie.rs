use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, Postgres, QueryBuilder};

use crate::database::Database;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    #[serde(rename = "poster_path")]
    pub image: Option<String>,
    pub release_date: NaiveDate,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub synopsis: Option<String>,
    #[serde(rename = "poster_path")]
    pub image: Option<String>,
    #[serde(rename = "backdrop_path")]
    pub backdrop: Option<String>,
    pub release_date: NaiveDate,
    pub duration: Option<String>,
    pub rating: f64,
    pub director: Option<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

const SUMMARY_SELECT: &str = r#"
SELECT m.id, m.title, m.image, m.release_date,
       COALESCE(ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL), '{}') AS genres
FROM movies m
LEFT JOIN movies_genre mg ON mg.movie_id = m.id
LEFT JOIN genres g ON g.id = mg.genre_id
WHERE m.is_deleted = FALSE"#;

/// Catalog filter. Absent fields add no condition.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub title: Option<String>,
    /// A movie matches only when it carries every listed genre.
    pub genres: Vec<String>,
}

impl MovieFilter {
    pub fn new(title: Option<String>, genres: Option<&str>) -> Self {
        let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

        let mut genres: Vec<String> = genres
            .unwrap_or_default()
            .split(',')
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        genres.sort();
        genres.dedup();

        Self { title, genres }
    }

    pub fn query(&self, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(SUMMARY_SELECT);

        if let Some(title) = &self.title {
            qb.push(" AND m.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(title)));
        }

        qb.push(" GROUP BY m.id");

        if !self.genres.is_empty() {
            qb.push(" HAVING COUNT(DISTINCT LOWER(g.name)) FILTER (WHERE LOWER(g.name) = ANY(")
                .push_bind(self.genres.clone())
                .push(")) = ")
                .push_bind(self.genres.len() as i64);
        }

        qb.push(" ORDER BY m.title ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        qb
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl MovieSummary {
    pub async fn search(
        filter: &MovieFilter,
        limit: i64,
        offset: i64,
        db: &Database,
    ) -> Result<Vec<MovieSummary>, sqlx::Error> {
        let mut qb = filter.query(limit, offset);
        qb.build_query_as::<MovieSummary>().fetch_all(&db.pool).await
    }

    pub async fn upcoming(limit: i64, offset: i64, db: &Database) -> Result<Vec<MovieSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(" AND m.release_date > CURRENT_DATE GROUP BY m.id ORDER BY m.release_date ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        qb.build_query_as::<MovieSummary>().fetch_all(&db.pool).await
    }

    pub async fn popular(limit: i64, offset: i64, db: &Database) -> Result<Vec<MovieSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(" AND m.rating >= 7.0 GROUP BY m.id ORDER BY m.rating DESC, m.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        qb.build_query_as::<MovieSummary>().fetch_all(&db.pool).await
    }
}

impl MovieDetail {
    pub async fn find(movie_id: i64, db: &Database) -> Result<Option<MovieDetail>, sqlx::Error> {
        sqlx::query_as::<_, MovieDetail>(
            r#"
            SELECT m.id, m.title, m.synopsis, m.image, m.backdrop, m.release_date,
                   m.duration, m.rating, d.name AS director,
                   COALESCE(ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL), '{}') AS genres,
                   COALESCE(ARRAY_AGG(DISTINCT a.name) FILTER (WHERE a.name IS NOT NULL), '{}') AS actors
            FROM movies m
            LEFT JOIN directors d ON d.id = m.director_id
            LEFT JOIN movies_genre mg ON mg.movie_id = m.id
            LEFT JOIN genres g ON g.id = mg.genre_id
            LEFT JOIN movies_actor ma ON ma.movie_id = m.id
            LEFT JOIN actors a ON a.id = ma.actor_id
            WHERE m.id = $1 AND m.is_deleted = FALSE
            GROUP BY m.id, d.name
            "#,
        )
        .bind(movie_id)
        .fetch_optional(&db.pool)
        .await
    }
}

impl Genre {
    pub async fn all(db: &Database) -> Result<Vec<Genre>, sqlx::Error> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(&db.pool)
            .await
    }
}
