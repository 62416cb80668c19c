use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::controllers::ok;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Genre, MovieDetail, MovieFilter, MovieSummary, PageQuery, Role};
use crate::AppState;

const CATALOG_PAGE_SIZE: u32 = 10;
const SHOWCASE_PAGE_SIZE: u32 = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/upcoming", get(upcoming_movies))
        .route("/movies/popular", get(popular_movies))
        .route("/movies/genres", get(list_genres))
        .route("/movies/{id}", get(movie_detail))
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieListQuery {
    pub title: Option<String>,
    /// Comma separated, e.g. `?genres=horror,drama`.
    pub genres: Option<String>,
    pub page: Option<u32>,
}

// GET /api/movies
async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MovieListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = MovieFilter::new(params.title, params.genres.as_deref());
    let (limit, offset) = PageQuery { page: params.page }.limit_offset(CATALOG_PAGE_SIZE);

    let movies = MovieSummary::search(&filter, limit, offset, &state.db).await?;
    Ok(ok(movies))
}

// GET /api/movies/upcoming
async fn upcoming_movies(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = page.limit_offset(SHOWCASE_PAGE_SIZE);
    Ok(ok(MovieSummary::upcoming(limit, offset, &state.db).await?))
}

// GET /api/movies/popular
async fn popular_movies(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = page.limit_offset(SHOWCASE_PAGE_SIZE);
    Ok(ok(MovieSummary::popular(limit, offset, &state.db).await?))
}

// GET /api/movies/genres
async fn list_genres(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(ok(Genre::all(&state.db).await?))
}

// GET /api/movies/{id}
async fn movie_detail(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(movie_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    user.require_role(&[Role::User, Role::Admin])?;

    let movie = MovieDetail::find(movie_id, &state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("movie {movie_id} not found")))?;
    Ok(ok(movie))
}
