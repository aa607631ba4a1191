//! Raw access to the `media_blobs` table.

use sqlx::{Row, SqlitePool};

/// Insert or replace the bytes stored under `id`.
pub async fn put_blob(pool: &SqlitePool, id: &str, data: &[u8]) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO media_blobs (id, data, size, stored_at)
        VALUES (?1, ?2, ?3, strftime('%s','now'))
        ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            size = excluded.size,
            stored_at = excluded.stored_at
        "#,
    )
    .bind(id)
    .bind(data)
    .bind(data.len() as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_blob(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Vec<u8>>> {
    let row = sqlx::query("SELECT data FROM media_blobs WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| r.try_get::<Vec<u8>, _>("data")).transpose()
}

pub async fn blob_size(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar("SELECT size FROM media_blobs WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Returns the number of rows removed (0 when the id was unknown).
pub async fn delete_blob(pool: &SqlitePool, id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM media_blobs WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn clear_blobs(pool: &SqlitePool) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM media_blobs").execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn total_size(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COALESCE(SUM(size), 0) FROM media_blobs")
        .fetch_one(pool)
        .await
}

pub async fn list_blob_ids(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT id FROM media_blobs ORDER BY stored_at, id")
        .fetch_all(pool)
        .await
}
