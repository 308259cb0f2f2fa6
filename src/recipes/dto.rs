use serde::{Deserialize, Serialize};

use super::{catalog::RecipeQuery, repo::Recipe};
use crate::error::AppError;

const MAX_SEARCH_RESULTS: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub cuisine: Option<String>,
    pub max_ready_minutes: Option<i32>,
    pub limit: Option<i64>,
}

impl SearchRequest {
    pub fn into_query(self) -> Result<RecipeQuery, AppError> {
        let text = self.query.trim().to_string();
        if text.is_empty() {
            return Err(AppError::BadRequest("query is required".into()));
        }
        let cuisine = self
            .cuisine
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(RecipeQuery {
            text,
            cuisine,
            max_ready_minutes: self.max_ready_minutes.filter(|m| *m > 0),
            limit: self.limit.unwrap_or(10).clamp(1, MAX_SEARCH_RESULTS),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<Recipe>,
    pub remaining_searches: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cuisine: Option<String>,
    pub ready_in_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.into(),
            cuisine: None,
            max_ready_minutes: None,
            limit: None,
        }
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(matches!(req("   ").into_query(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(req("dal").into_query().unwrap().limit, 10);

        let mut big = req("dal");
        big.limit = Some(500);
        assert_eq!(big.into_query().unwrap().limit, MAX_SEARCH_RESULTS);

        let mut zero = req("dal");
        zero.limit = Some(0);
        assert_eq!(zero.into_query().unwrap().limit, 1);
    }

    #[test]
    fn snake_case_body_keeps_filters() {
        let body: SearchRequest = serde_json::from_str(
            r#"{"query":"dal","cuisine":"Indian","max_ready_minutes":20,"limit":5}"#,
        )
        .unwrap();
        assert_eq!(body.max_ready_minutes, Some(20));

        let q = body.into_query().unwrap();
        assert_eq!(q.max_ready_minutes, Some(20));
        assert_eq!(q.cuisine.as_deref(), Some("Indian"));
        assert_eq!(q.limit, 5);
    }

    #[test]
    fn new_recipe_body_is_snake_case() {
        let body: CreateRecipeRequest =
            serde_json::from_str(r#"{"title":"Dal Tadka","ready_in_minutes":30}"#).unwrap();
        assert_eq!(body.ready_in_minutes, Some(30));
        assert!(body.ingredients.is_empty());
    }

    #[test]
    fn blank_cuisine_is_dropped() {
        let mut r = req(" dal ");
        r.cuisine = Some("  ".into());
        let q = r.into_query().unwrap();
        assert_eq!(q.text, "dal");
        assert_eq!(q.cuisine, None);
    }
}
