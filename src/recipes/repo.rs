use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub summary: Option<String>,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
    pub cuisine: Option<String>,
    pub ready_in_minutes: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub summary: Option<&'a str>,
    pub ingredients: &'a [String],
    pub tags: &'a [String],
    pub cuisine: Option<&'a str>,
    pub ready_in_minutes: Option<i32>,
}

pub async fn create(db: &PgPool, author_id: Uuid, r: NewRecipe<'_>) -> anyhow::Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (author_id, title, summary, ingredients, tags, cuisine, ready_in_minutes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, author_id, title, summary, ingredients, tags, cuisine,
                  ready_in_minutes, created_at
        "#,
    )
    .bind(author_id)
    .bind(r.title)
    .bind(r.summary)
    .bind(r.ingredients)
    .bind(r.tags)
    .bind(r.cuisine)
    .bind(r.ready_in_minutes)
    .fetch_one(db)
    .await
    .context("insert recipe")?;

    Ok(recipe)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, author_id, title, summary, ingredients, tags, cuisine,
               ready_in_minutes, created_at
          FROM recipes
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get recipe")?;

    Ok(recipe)
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, author_id, title, summary, ingredients, tags, cuisine,
               ready_in_minutes, created_at
          FROM recipes
         ORDER BY created_at DESC
         LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list recipes")?;

    Ok(rows)
}
