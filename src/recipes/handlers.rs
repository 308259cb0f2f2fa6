use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateRecipeRequest, Pagination, SearchRequest, SearchResponse},
    repo::{self, NewRecipe, Recipe},
};
use crate::{
    auth::{require_admin, require_auth, AuthUser},
    error::AppError,
    quota::{middleware::search_quota, QuotaGate, SearchAllowance, SearchLimits},
    state::AppState,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    // route_layer order: the last one added runs first.
    let search = Router::new()
        .route("/recipes/search", post(search_recipes))
        .route_layer(from_fn_with_state(state.clone(), search_quota))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_search = Router::new()
        .route("/admin/recipes/search", post(search_recipes))
        .route_layer(from_fn_with_state(state.clone(), search_quota))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/search/limits", get(search_limits))
        .route("/recipes/:id", get(get_recipe))
        .merge(search)
        .merge(admin_search)
}

#[instrument(skip(state, allowance))]
pub async fn search_recipes(
    State(state): State<AppState>,
    Extension(allowance): Extension<SearchAllowance>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = body.into_query()?;
    let results = state.recipes.search(&query).await?;
    info!(
        query = %query.text,
        hits = results.len(),
        remaining = allowance.remaining,
        "recipe search"
    );
    Ok(Json(SearchResponse {
        success: true,
        results,
        remaining_searches: allowance.remaining,
    }))
}

#[instrument(skip(state))]
pub async fn search_limits(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SearchLimits>, AppError> {
    let gate = QuotaGate::new(state.quota.as_ref(), state.config.quota.utc_offset);
    Ok(Json(gate.status(user_id).await?))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);
    Ok(Json(repo::list(&state.db, limit, offset).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipe>, AppError> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

fn validate_new_recipe(body: &CreateRecipeRequest) -> Result<(), AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    if body.ready_in_minutes.is_some_and(|m| m < 0) {
        return Err(AppError::BadRequest("ready_in_minutes must not be negative".into()));
    }
    Ok(())
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), AppError> {
    validate_new_recipe(&body)?;
    let recipe = repo::create(
        &state.db,
        user_id,
        NewRecipe {
            title: body.title.trim(),
            summary: body.summary.as_deref(),
            ingredients: &body.ingredients,
            tags: &body.tags,
            cuisine: body.cuisine.as_deref(),
            ready_in_minutes: body.ready_in_minutes,
        },
    )
    .await?;
    info!(%user_id, recipe_id = %recipe.id, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}
