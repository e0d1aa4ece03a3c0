use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{
    Area, AreaId, AreaStatus, AreaSummary, Boundary, BoundingBox, Centroid, NewArea, Page,
    PageRequest, Tile, TileCommit, TileStatus, VariableBag,
};
use uuid::Uuid;

use super::PostgresStore;
use crate::ports::AreaStore;

fn db_err(context: &str) -> impl Fn(sqlx::Error) -> TumbuhError + '_ {
    move |e| TumbuhError::Storage(format!("{}: {}", context, e))
}

fn json_field<T: serde::de::DeserializeOwned>(row: &PgRow, column: &str) -> Result<T> {
    let value: serde_json::Value = row.try_get(column).map_err(db_err(column))?;
    serde_json::from_value(value)
        .map_err(|e| TumbuhError::Serialization(format!("Invalid {} column: {}", column, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn index_to_i32(value: usize, column: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| TumbuhError::Storage(format!("{} {} out of range", column, value)))
}

fn row_to_area(row: &PgRow) -> Result<Area> {
    let id: Uuid = row.try_get("id").map_err(db_err("id"))?;
    let status: String = row.try_get("status").map_err(db_err("status"))?;
    let tile_size: i32 = row.try_get("tile_size_meters").map_err(db_err("tile_size_meters"))?;

    Ok(Area {
        id: AreaId(id),
        name: row.try_get("name").map_err(db_err("name"))?,
        geometry: row.try_get("geometry").map_err(db_err("geometry"))?,
        boundary: json_field::<Boundary>(row, "boundary")?,
        tile_size_meters: tile_size.max(0) as u32,
        status: status.parse()?,
        matrix: json_field(row, "matrix")?,
        metadata: json_field(row, "metadata")?,
        processing_seconds: row.try_get("processing_seconds").map_err(db_err("processing_seconds"))?,
        error_detail: row.try_get("error_detail").map_err(db_err("error_detail"))?,
        created_at: row.try_get("created_at").map_err(db_err("created_at"))?,
        updated_at: row.try_get("updated_at").map_err(db_err("updated_at"))?,
    })
}

fn row_to_tile(row: &PgRow) -> Result<Tile> {
    let area_id: Uuid = row.try_get("area_id").map_err(db_err("area_id"))?;
    let row_index: i32 = row.try_get("row_index").map_err(db_err("row_index"))?;
    let col_index: i32 = row.try_get("col_index").map_err(db_err("col_index"))?;
    let status: String = row.try_get("status").map_err(db_err("status"))?;

    Ok(Tile {
        area_id: AreaId(area_id),
        row_index: row_index.max(0) as usize,
        col_index: col_index.max(0) as usize,
        footprint: json_field::<BoundingBox>(row, "footprint")?,
        centroid: Centroid::new(
            row.try_get("centroid_lat").map_err(db_err("centroid_lat"))?,
            row.try_get("centroid_lon").map_err(db_err("centroid_lon"))?,
        ),
        variables: json_field::<VariableBag>(row, "variables")?,
        recommendations: json_field(row, "recommendations")?,
        status: status.parse::<TileStatus>()?,
        failure: row.try_get("failure").map_err(db_err("failure"))?,
    })
}

/// Lock the area row and check that it may move to `next`
async fn lock_for_transition(
    tx: &mut Transaction<'_, Postgres>,
    id: AreaId,
    next: AreaStatus,
) -> Result<()> {
    let current: Option<String> =
        sqlx::query_scalar("SELECT status FROM areas WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err("Failed to lock area"))?;

    let current: AreaStatus = current.ok_or(TumbuhError::AreaNotFound { id })?.parse()?;
    if !current.can_transition_to(next) {
        return Err(TumbuhError::InvalidTransition { id, from: current, to: next });
    }
    Ok(())
}

#[async_trait]
impl AreaStore for PostgresStore {
    async fn create_area(&self, area: NewArea) -> Result<AreaId> {
        let id = AreaId::new();

        sqlx::query(
            r#"
            INSERT INTO areas (id, name, geometry, boundary, tile_size_meters, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.0)
        .bind(&area.name)
        .bind(&area.geometry)
        .bind(to_json(&area.boundary)?)
        .bind(area.tile_size_meters as i32)
        .bind(AreaStatus::Pending.as_str())
        .execute(self.pool())
        .await
        .map_err(db_err("Failed to create area"))?;

        Ok(id)
    }

    async fn update_area_status(
        &self,
        id: AreaId,
        status: AreaStatus,
        detail: Option<String>,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err("Failed to begin transaction"))?;
        lock_for_transition(&mut tx, id, status).await?;

        let detail = if status == AreaStatus::Failed { detail } else { None };
        sqlx::query(
            r#"
            UPDATE areas
            SET status = $2,
                error_detail = COALESCE($3, error_detail),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(status.as_str())
        .bind(detail)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update area status"))?;

        tx.commit().await.map_err(db_err("Failed to commit status update"))?;
        Ok(())
    }

    async fn write_tiles(&self, id: AreaId, commit: TileCommit) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err("Failed to begin transaction"))?;
        lock_for_transition(&mut tx, id, AreaStatus::Complete).await?;

        sqlx::query("DELETE FROM tiles WHERE area_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to clear tiles"))?;

        for tile in &commit.tiles {
            sqlx::query(
                r#"
                INSERT INTO tiles (
                    area_id, row_index, col_index, footprint, centroid_lat, centroid_lon,
                    variables, recommendations, status, failure
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(id.0)
            .bind(index_to_i32(tile.row_index, "row_index")?)
            .bind(index_to_i32(tile.col_index, "col_index")?)
            .bind(to_json(&tile.footprint)?)
            .bind(tile.centroid.lat)
            .bind(tile.centroid.lon)
            .bind(to_json(&tile.variables)?)
            .bind(to_json(&tile.recommendations)?)
            .bind(tile.status.as_str())
            .bind(&tile.failure)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert tile"))?;
        }

        sqlx::query(
            r#"
            UPDATE areas
            SET status = $2,
                processing_seconds = $3,
                matrix = $4,
                metadata = metadata || $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(AreaStatus::Complete.as_str())
        .bind(commit.processing_seconds)
        .bind(to_json(&commit.matrix)?)
        .bind(serde_json::Value::Object(commit.metadata))
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to complete area"))?;

        tx.commit().await.map_err(db_err("Failed to commit tiles"))?;

        tracing::debug!(area_id = %id, tiles = commit.tiles.len(), "Committed tile set");
        Ok(())
    }

    async fn update_area_metadata(
        &self,
        id: AreaId,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE areas SET metadata = metadata || $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.0)
        .bind(serde_json::Value::Object(metadata))
        .execute(self.pool())
        .await
        .map_err(db_err("Failed to update area metadata"))?;

        if result.rows_affected() == 0 {
            return Err(TumbuhError::AreaNotFound { id });
        }
        Ok(())
    }

    async fn get_area(&self, id: AreaId) -> Result<Option<Area>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, geometry, boundary, tile_size_meters, status, matrix, metadata,
                   processing_seconds, error_detail, created_at, updated_at
            FROM areas
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to get area"))?;

        row.as_ref().map(row_to_area).transpose()
    }

    async fn get_tiles(&self, id: AreaId, page: PageRequest) -> Result<Page<Tile>> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM tiles WHERE area_id = $1) FROM areas WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to count tiles"))?;
        let total = total.ok_or(TumbuhError::AreaNotFound { id })?;

        let limit = i64::try_from(page.per_page).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT area_id, row_index, col_index, footprint, centroid_lat, centroid_lon,
                   variables, recommendations, status, failure
            FROM tiles
            WHERE area_id = $1
            ORDER BY row_index, col_index
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(id.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to get tiles"))?;

        let items = rows.iter().map(row_to_tile).collect::<Result<Vec<_>>>()?;

        Ok(Page { items, page: page.page, per_page: page.per_page, total: total.max(0) as usize })
    }

    async fn list_areas(&self) -> Result<Vec<AreaSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.name, a.status, a.tile_size_meters, a.processing_seconds, a.created_at,
                   (SELECT COUNT(*) FROM tiles t WHERE t.area_id = a.id) AS tile_count
            FROM areas a
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list areas"))?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(db_err("id"))?;
                let status: String = row.try_get("status").map_err(db_err("status"))?;
                let tile_size: i32 =
                    row.try_get("tile_size_meters").map_err(db_err("tile_size_meters"))?;
                let tile_count: i64 = row.try_get("tile_count").map_err(db_err("tile_count"))?;

                Ok(AreaSummary {
                    id: AreaId(id),
                    name: row.try_get("name").map_err(db_err("name"))?,
                    status: status.parse()?,
                    tile_size_meters: tile_size.max(0) as u32,
                    tile_count: tile_count.max(0) as usize,
                    processing_seconds: row
                        .try_get("processing_seconds")
                        .map_err(db_err("processing_seconds"))?,
                    created_at: row.try_get("created_at").map_err(db_err("created_at"))?,
                })
            })
            .collect()
    }
}
