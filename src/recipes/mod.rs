mod catalog;
mod dto;
pub mod handlers;
mod repo;

pub use catalog::{PgRecipeCatalog, RecipeCatalog};

#[cfg(test)]
pub(crate) use catalog::memory;

use crate::state::AppState;
use axum::Router;

pub fn router(state: &AppState) -> Router<AppState> {
    handlers::routes(state)
}
