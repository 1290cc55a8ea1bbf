//! Postgres-backed fact provider
//!
//! The graph lives in plain relational tables (see `migrations/`):
//! `games`, `users`, `friendships`, `likes`, `plays`, and attribute nodes in
//! `attributes` joined to games through `game_attributes`. Queries are checked
//! at runtime so the crate builds without a live database.
use std::collections::{BTreeSet, HashMap, HashSet};

use sqlx::{FromRow, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{AttributeKind, AttributeNode, CategoryKind, Game, GameId, GameRef, UserId},
    services::facts::FactProvider,
};

const FRIENDS_QUERY: &str = r#"
    SELECT friend_id FROM friendships WHERE user_id = $1
    UNION
    SELECT user_id FROM friendships WHERE friend_id = $1
"#;

const FRIENDS_OF_FRIENDS_QUERY: &str = r#"
    WITH edges AS (
        SELECT user_id AS a, friend_id AS b FROM friendships
        UNION
        SELECT friend_id AS a, user_id AS b FROM friendships
    ),
    direct AS (
        SELECT b AS id FROM edges WHERE a = $1
    )
    SELECT DISTINCT e.b
    FROM direct d
    JOIN edges e ON e.a = d.id
    WHERE e.b <> $1
      AND e.b NOT IN (SELECT id FROM direct)
"#;

const GAMES_MATCHING_QUERY: &str = r#"
    SELECT g.id, g.name
    FROM games g
    WHERE (cardinality($1::text[]) = 0 OR EXISTS (
            SELECT 1 FROM game_attributes ga
            JOIN attributes a ON a.id = ga.attribute_id
            WHERE ga.game_id = g.id AND a.kind = 'genre' AND a.name = ANY($1)))
      AND (cardinality($2::text[]) = 0 OR EXISTS (
            SELECT 1 FROM game_attributes ga
            JOIN attributes a ON a.id = ga.attribute_id
            WHERE ga.game_id = g.id AND a.kind = 'platform' AND a.name = ANY($2)))
    ORDER BY g.id
"#;

#[derive(Debug, FromRow)]
struct GameRow {
    id: String,
    name: String,
    critic_score: f64,
    sales: f64,
    release_year: Option<i32>,
    rating: Option<String>,
    max_players: i32,
    cross_platform: bool,
}

#[derive(Debug, FromRow)]
struct AttributeRow {
    kind: String,
    id: i64,
    name: String,
}

#[derive(Debug, FromRow)]
struct GameAttributeRow {
    game_id: String,
    kind: String,
    name: String,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        let mut game = Game::new(row.id, row.name);
        game.critic_score = row.critic_score;
        game.sales = row.sales;
        game.release_year = row.release_year;
        game.rating = row.rating;
        game.max_players = row.max_players.max(0) as u32;
        game.cross_platform = row.cross_platform;
        game
    }
}

fn parse_kind(kind: &str) -> AppResult<AttributeKind> {
    AttributeKind::parse(kind)
        .ok_or_else(|| AppError::FactProvider(format!("Unknown attribute kind '{}'", kind)))
}

fn to_game_refs(rows: Vec<(String, String)>) -> Vec<GameRef> {
    rows.into_iter()
        .map(|(id, name)| GameRef::new(id, name))
        .collect()
}

#[derive(Clone)]
pub struct PgFactProvider {
    pool: PgPool,
}

impl PgFactProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attribute_names(&self, game_id: &GameId, kind: AttributeKind) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.name
            FROM game_attributes ga
            JOIN attributes a ON a.id = ga.attribute_id
            WHERE ga.game_id = $1 AND a.kind = $2
            ORDER BY a.name
            "#,
        )
        .bind(game_id.as_str())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }
}

#[async_trait::async_trait]
impl FactProvider for PgFactProvider {
    async fn find_game(&self, game_id: &GameId) -> AppResult<Option<GameRef>> {
        let row = sqlx::query_as::<_, (String, String)>("SELECT id, name FROM games WHERE id = $1")
            .bind(game_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, name)| GameRef::new(id, name)))
    }

    async fn user_exists(&self, user_id: &UserId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn games_by_ids(&self, game_ids: &[GameId]) -> AppResult<Vec<Game>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = game_ids.iter().map(|id| id.0.clone()).collect();

        let rows = sqlx::query_as::<_, GameRow>(
            r#"
            SELECT id, name, critic_score, sales, release_year, rating, max_players, cross_platform
            FROM games
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let attribute_rows = sqlx::query_as::<_, GameAttributeRow>(
            r#"
            SELECT ga.game_id, a.kind, a.name
            FROM game_attributes ga
            JOIN attributes a ON a.id = ga.attribute_id
            WHERE ga.game_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut games: HashMap<String, Game> = rows
            .into_iter()
            .map(|row| (row.id.clone(), Game::from(row)))
            .collect();

        for row in attribute_rows {
            let Some(game) = games.get_mut(&row.game_id) else {
                continue;
            };
            match parse_kind(&row.kind)? {
                AttributeKind::Genre => {
                    game.genres.insert(row.name);
                }
                AttributeKind::Platform => {
                    game.platforms.insert(row.name);
                }
                AttributeKind::Developer => game.developer = Some(row.name),
                AttributeKind::Feature => {
                    game.features.insert(row.name);
                }
            }
        }

        // Preserve the caller's order
        Ok(ids.iter().filter_map(|id| games.remove(id)).collect())
    }

    async fn friends_of(&self, user_id: &UserId) -> AppResult<HashSet<UserId>> {
        let ids = sqlx::query_scalar::<_, String>(FRIENDS_QUERY)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn friends_of_friends(&self, user_id: &UserId) -> AppResult<HashSet<UserId>> {
        let ids = sqlx::query_scalar::<_, String>(FRIENDS_OF_FRIENDS_QUERY)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn liked_games(&self, user_id: &UserId) -> AppResult<Vec<GameRef>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT g.id, g.name
            FROM likes l
            JOIN games g ON g.id = l.game_id
            WHERE l.user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(to_game_refs(rows))
    }

    async fn played_or_liked_games(&self, user_id: &UserId) -> AppResult<HashSet<GameId>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT game_id FROM likes WHERE user_id = $1
            UNION
            SELECT game_id FROM plays WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(GameId).collect())
    }

    async fn users_who_like(&self, game_id: &GameId) -> AppResult<HashSet<UserId>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT user_id FROM likes WHERE game_id = $1")
            .bind(game_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn attributes_of(&self, game_id: &GameId) -> AppResult<Vec<AttributeNode>> {
        let rows = sqlx::query_as::<_, AttributeRow>(
            r#"
            SELECT a.kind, a.id, a.name
            FROM game_attributes ga
            JOIN attributes a ON a.id = ga.attribute_id
            WHERE ga.game_id = $1
            "#,
        )
        .bind(game_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(AttributeNode {
                    kind: parse_kind(&row.kind)?,
                    id: row.id,
                    name: row.name,
                })
            })
            .collect()
    }

    async fn games_sharing_attribute(&self, attribute: &AttributeNode) -> AppResult<Vec<GameRef>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT g.id, g.name
            FROM game_attributes ga
            JOIN games g ON g.id = ga.game_id
            WHERE ga.attribute_id = $1
            "#,
        )
        .bind(attribute.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(to_game_refs(rows))
    }

    async fn genres_of(&self, game_id: &GameId) -> AppResult<BTreeSet<String>> {
        Ok(self
            .attribute_names(game_id, AttributeKind::Genre)
            .await?
            .into_iter()
            .collect())
    }

    async fn platforms_of(&self, game_id: &GameId) -> AppResult<BTreeSet<String>> {
        Ok(self
            .attribute_names(game_id, AttributeKind::Platform)
            .await?
            .into_iter()
            .collect())
    }

    async fn developer_of(&self, game_id: &GameId) -> AppResult<Option<String>> {
        Ok(self
            .attribute_names(game_id, AttributeKind::Developer)
            .await?
            .into_iter()
            .next())
    }

    async fn games_matching(
        &self,
        genres: &BTreeSet<String>,
        platforms: &BTreeSet<String>,
    ) -> AppResult<Vec<GameRef>> {
        let genres: Vec<String> = genres.iter().cloned().collect();
        let platforms: Vec<String> = platforms.iter().cloned().collect();

        let rows = sqlx::query_as::<_, (String, String)>(GAMES_MATCHING_QUERY)
            .bind(&genres)
            .bind(&platforms)
            .fetch_all(&self.pool)
            .await?;

        Ok(to_game_refs(rows))
    }

    async fn category_edges(&self, kind: CategoryKind) -> AppResult<Vec<(GameId, String)>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT ga.game_id, a.name
            FROM game_attributes ga
            JOIN attributes a ON a.id = ga.attribute_id
            WHERE a.kind = $1
            "#,
        )
        .bind(AttributeKind::from(kind).as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(game_id, name)| (GameId(game_id), name))
            .collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
