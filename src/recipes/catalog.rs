use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo::Recipe;

/// Normalised search input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeQuery {
    pub text: String,
    pub cuisine: Option<String>,
    pub max_ready_minutes: Option<i32>,
    pub limit: i64,
}

#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    async fn search(&self, query: &RecipeQuery) -> anyhow::Result<Vec<Recipe>>;
}

#[derive(Clone)]
pub struct PgRecipeCatalog {
    db: PgPool,
}

impl PgRecipeCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// `%text%` with LIKE wildcards in the user's text escaped.
pub fn like_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl RecipeCatalog for PgRecipeCatalog {
    async fn search(&self, query: &RecipeQuery) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, author_id, title, summary, ingredients, tags, cuisine,
                   ready_in_minutes, created_at
              FROM recipes
             WHERE (title ILIKE $1
                    OR summary ILIKE $1
                    OR EXISTS (SELECT 1 FROM unnest(ingredients) AS i WHERE i ILIKE $1))
               AND ($2::text IS NULL OR cuisine ILIKE $2)
               AND ($3::int IS NULL OR ready_in_minutes <= $3)
             ORDER BY created_at DESC
             LIMIT $4
            "#,
        )
        .bind(like_pattern(&query.text))
        .bind(query.cuisine.as_deref())
        .bind(query.max_ready_minutes)
        .bind(query.limit)
        .fetch_all(&self.db)
        .await
        .context("search recipes")?;

        Ok(rows)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("paneer"), "%paneer%");
        assert_eq!(like_pattern("100%_rye\\"), "%100\\%\\_rye\\\\%");
    }
}
