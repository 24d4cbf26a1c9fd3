use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::{FeatureRow, ImageRow, NewImage};

/// 添加图片记录，路径已存在时覆盖旧记录并重新激活
pub async fn upsert_image<'c, E>(executor: E, image: &NewImage<'_>) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO image (path, hash, format, width, height, frame_aspect, active, orig_timestamp)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?)
        ON CONFLICT (path) DO UPDATE SET
            hash = excluded.hash,
            format = excluded.format,
            width = excluded.width,
            height = excluded.height,
            frame_aspect = excluded.frame_aspect,
            active = 1,
            orig_timestamp = excluded.orig_timestamp
        RETURNING id
        "#,
    )
    .bind(image.path)
    .bind(image.hash)
    .bind(image.format)
    .bind(image.width)
    .bind(image.height)
    .bind(image.frame_aspect)
    .bind(image.orig_timestamp)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// 添加或覆盖某一层级的特征
pub async fn store_feature<'c, E>(executor: E, image_id: i64, level: u8, vector: &[u8]) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO level_feature (image_id, level, vector)
        VALUES (?, ?, ?)
        ON CONFLICT (image_id, level) DO UPDATE SET vector = excluded.vector
        "#,
    )
    .bind(image_id)
    .bind(level as i64)
    .bind(vector)
    .execute(executor)
    .await?;

    Ok(())
}

/// 检查图片哈希是否存在
pub async fn check_image_hash(executor: &SqlitePool, hash: &[u8]) -> Result<bool> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM image WHERE hash = ?")
        .bind(hash)
        .fetch_one(executor)
        .await?;

    Ok(count > 0)
}

/// 根据哈希更新图片路径
pub async fn update_image_path(executor: &SqlitePool, hash: &[u8], path: &str) -> Result<()> {
    sqlx::query("UPDATE image SET path = ? WHERE hash = ?")
        .bind(path)
        .bind(hash)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn get_image_path(executor: &SqlitePool, id: i64) -> Result<String> {
    let (path,): (String,) = sqlx::query_as("SELECT path FROM image WHERE id = ?")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(path)
}

/// 获取所有图片记录，按 ID 升序
pub async fn get_images(executor: &SqlitePool) -> Result<Vec<ImageRow>> {
    sqlx::query_as::<_, ImageRow>(
        r#"
        SELECT id, path, hash, format, width, height, frame_aspect, active, orig_timestamp
        FROM image
        ORDER BY id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 获取所有已激活图片的特征
pub async fn get_active_features(executor: &SqlitePool) -> Result<Vec<FeatureRow>> {
    sqlx::query_as::<_, FeatureRow>(
        r#"
        SELECT level_feature.image_id, level_feature.level, level_feature.vector
        FROM level_feature
        JOIN image ON image.id = level_feature.image_id
        WHERE image.active = 1
        ORDER BY level_feature.image_id ASC, level_feature.level ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 设置图片是否参与匹配
pub async fn set_active(executor: &SqlitePool, id: i64, active: bool) -> Result<()> {
    sqlx::query("UPDATE image SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

/// 删除图片及其特征
pub async fn delete_image(executor: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM image WHERE id = ?").bind(id).execute(executor).await?;

    Ok(())
}

/// 查询图片总数、已激活数量以及特征完整的图片数量
pub async fn get_count(executor: &SqlitePool) -> Result<(i64, i64, i64)> {
    let (total, active): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(active), 0) FROM image")
            .fetch_one(executor)
            .await?;

    let (complete,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM (
            SELECT image_id FROM level_feature GROUP BY image_id HAVING COUNT(*) = 3
        )
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok((total, active, complete))
}
