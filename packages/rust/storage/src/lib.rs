//! libSQL storage layer for posts.
//!
//! The [`Storage`] struct wraps a local libSQL database and implements the
//! [`PostStore`] port used by the reconciliation jobs, plus a few read
//! queries used by the CLI.

mod migrations;

use std::path::Path;

use chrono::Utc;
use devread_shared::{DevreadError, Post, PostStore, Result};
use libsql::{Connection, Database, Row, params};

const POST_COLUMNS: &str = "post_id, name, link, tags_json";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DevreadError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DevreadError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Post lookups
    // -----------------------------------------------------------------------

    /// Get a post by its identity.
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        self.query_one(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
            post_id,
        )
        .await
    }

    /// Get the oldest post stored under `name`.
    pub async fn get_post_by_name(&self, name: &str) -> Result<Option<Post>> {
        self.query_one(
            &format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE name = ?1 ORDER BY created_at LIMIT 1"
            ),
            name,
        )
        .await
    }

    async fn query_one(&self, sql: &str, key: &str) -> Result<Option<Post>> {
        let mut rows = self
            .conn
            .query(sql, params![key])
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_post(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DevreadError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Post writes
    // -----------------------------------------------------------------------

    /// Insert a post. An existing row with the same identity is left untouched.
    pub async fn insert_post(&self, post: &Post) -> Result<Post> {
        let now = Utc::now().to_rfc3339();
        let tags_json = tags_to_json(post)?;
        self.conn
            .execute(
                "INSERT INTO posts (post_id, name, link, tags_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(post_id) DO NOTHING",
                params![
                    post.post_id(),
                    post.name(),
                    post.link(),
                    tags_json.as_str(),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        self.get_post(post.post_id()).await?.ok_or_else(|| {
            DevreadError::Storage(format!("post {} missing after insert", post.post_id()))
        })
    }

    /// Rewrite the row with the post's identity, or failing that the row with its name.
    pub async fn update_post(&self, post: &Post) -> Result<Post> {
        let now = Utc::now().to_rfc3339();
        let tags_json = tags_to_json(post)?;

        let by_id = self
            .conn
            .execute(
                "UPDATE posts SET name = ?1, link = ?2, tags_json = ?3, updated_at = ?4
                 WHERE post_id = ?5",
                params![
                    post.name(),
                    post.link(),
                    tags_json.as_str(),
                    now.as_str(),
                    post.post_id()
                ],
            )
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        if by_id == 0 {
            let by_name = self
                .conn
                .execute(
                    "UPDATE posts SET post_id = ?1, link = ?2, tags_json = ?3, updated_at = ?4
                     WHERE name = ?5",
                    params![
                        post.post_id(),
                        post.link(),
                        tags_json.as_str(),
                        now.as_str(),
                        post.name()
                    ],
                )
                .await
                .map_err(|e| DevreadError::Storage(e.to_string()))?;

            if by_name == 0 {
                return Err(DevreadError::Storage(format!(
                    "no stored post matches '{}' ({})",
                    post.name(),
                    post.post_id()
                )));
            }
        }

        Ok(post.clone())
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// List the most recently updated posts.
    pub async fn list_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {POST_COLUMNS} FROM posts ORDER BY updated_at DESC LIMIT ?1"),
                params![i64::from(limit)],
            )
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_post(&row)?);
        }
        Ok(results)
    }

    /// List the most recently updated posts carrying `tag`.
    pub async fn list_posts_by_tag(&self, tag: &str, limit: u32) -> Result<Vec<Post>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts
                     WHERE EXISTS (SELECT 1 FROM json_each(posts.tags_json) WHERE value = ?1)
                     ORDER BY updated_at DESC LIMIT ?2"
                ),
                params![tag, i64::from(limit)],
            )
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_post(&row)?);
        }
        Ok(results)
    }

    /// Count all stored posts.
    pub async fn count_posts(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM posts", params![])
            .await
            .map_err(|e| DevreadError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| DevreadError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(DevreadError::Storage(e.to_string())),
        }
    }
}

impl PostStore for Storage {
    async fn lookup_by_id(&self, post_id: &str) -> Result<Option<Post>> {
        self.get_post(post_id).await
    }

    async fn lookup_by_name(&self, name: &str) -> Result<Option<Post>> {
        self.get_post_by_name(name).await
    }

    async fn insert(&self, post: &Post) -> Result<Post> {
        self.insert_post(post).await
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        self.update_post(post).await
    }
}

fn tags_to_json(post: &Post) -> Result<String> {
    serde_json::to_string(post.tags()).map_err(|e| DevreadError::Storage(e.to_string()))
}

/// Map a database row to a `Post`.
fn row_to_post(row: &Row) -> Result<Post> {
    let tags_json: String = row
        .get(3)
        .map_err(|e| DevreadError::Storage(e.to_string()))?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| DevreadError::parse(format!("bad tags_json: {e}")))?;

    Ok(Post::from_stored(
        row.get::<String>(0)
            .map_err(|e| DevreadError::Storage(e.to_string()))?,
        row.get::<String>(1)
            .map_err(|e| DevreadError::Storage(e.to_string()))?,
        row.get::<String>(2)
            .map_err(|e| DevreadError::Storage(e.to_string()))?,
        tags,
    ))
}
