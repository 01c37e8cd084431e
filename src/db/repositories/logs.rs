use crate::entities::{api_logs, prelude::*};
use crate::models::api_log::{
    ApiLogEntry, ApiLogSummary, IpCount, LogFilter, MethodCount, NewApiLog, OverallStats,
    PathStats,
};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, Statement,
};

pub struct LogRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, FromQueryResult)]
struct OverallRow {
    total: i64,
    avg_response_time: Option<f64>,
    max_response_time: Option<i64>,
    min_response_time: Option<i64>,
    error_count: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct MethodRow {
    method: String,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct PathRow {
    path: String,
    count: i64,
    avg_response_time: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct IpRow {
    ip: String,
    count: i64,
}

impl LogRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, entry: NewApiLog, created_at: String) -> Result<()> {
        let active_model = api_logs::ActiveModel {
            method: Set(entry.method),
            path: Set(entry.path),
            ip: Set(entry.ip),
            user_agent: Set(entry.user_agent),
            status_code: Set(i32::from(entry.status_code)),
            response_time: Set(entry.response_time_ms),
            user_id: Set(entry.user_id),
            username: Set(entry.username),
            admin_id: Set(entry.admin_id),
            admin_name: Set(entry.admin_name),
            request_body: Set(entry.request_body),
            error: Set(entry.error),
            created_at: Set(created_at),
            ..Default::default()
        };

        ApiLogs::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    /// Returns one page (1-based) newest first, plus the total number of matching rows.
    pub async fn get_logs(
        &self,
        filter: &LogFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ApiLogSummary>, u64)> {
        let paginator = newest_first(filtered(filter)).paginate(&self.conn, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(ApiLogSummary::from).collect(), total))
    }

    pub async fn get(&self, id: i32) -> Result<Option<ApiLogEntry>> {
        let entry = ApiLogs::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query log entry")?;

        Ok(entry.map(ApiLogEntry::from))
    }

    pub async fn overall_stats(&self) -> Result<OverallStats> {
        let row = OverallRow::find_by_statement(sql(
            "SELECT COUNT(*) AS total, \
                AVG(response_time) AS avg_response_time, \
                MAX(response_time) AS max_response_time, \
                MIN(response_time) AS min_response_time, \
                SUM(CASE WHEN status_code >= 400 THEN 1 ELSE 0 END) AS error_count \
             FROM api_logs",
        ))
        .one(&self.conn)
        .await?;

        Ok(row.map_or_else(OverallStats::default, |r| OverallStats {
            total: r.total,
            avg_response_time: round2(r.avg_response_time.unwrap_or(0.0)),
            max_response_time: r.max_response_time.unwrap_or(0),
            min_response_time: r.min_response_time.unwrap_or(0),
            error_count: r.error_count.unwrap_or(0),
        }))
    }

    pub async fn method_counts(&self) -> Result<Vec<MethodCount>> {
        let rows = MethodRow::find_by_statement(sql(
            "SELECT method, COUNT(*) AS count FROM api_logs \
             GROUP BY method ORDER BY count DESC",
        ))
        .all(&self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MethodCount {
                method: r.method,
                count: r.count,
            })
            .collect())
    }

    pub async fn top_paths(&self, limit: u32) -> Result<Vec<PathStats>> {
        let rows = PathRow::find_by_statement(sql(&format!(
            "SELECT SUBSTR(path, 1, 100) AS path, COUNT(*) AS count, \
                AVG(response_time) AS avg_response_time \
             FROM api_logs GROUP BY SUBSTR(path, 1, 100) \
             ORDER BY count DESC LIMIT {limit}"
        )))
        .all(&self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PathStats {
                path: r.path,
                count: r.count,
                avg_response_time: round2(r.avg_response_time.unwrap_or(0.0)),
            })
            .collect())
    }

    pub async fn top_ips(&self, limit: u32) -> Result<Vec<IpCount>> {
        let rows = IpRow::find_by_statement(sql(&format!(
            "SELECT ip, COUNT(*) AS count FROM api_logs \
             GROUP BY ip ORDER BY count DESC LIMIT {limit}"
        )))
        .all(&self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| IpCount {
                ip: r.ip,
                count: r.count,
            })
            .collect())
    }

    /// Query for the newest `limit` rows, for streaming export.
    #[must_use]
    pub fn export_query(limit: u64) -> Select<ApiLogs> {
        newest_first(ApiLogs::find()).limit(limit)
    }

    pub async fn delete_older_than<C: ConnectionTrait>(db: &C, cutoff: &str) -> Result<u64> {
        let result = ApiLogs::delete_many()
            .filter(api_logs::Column::CreatedAt.lt(cutoff))
            .exec(db)
            .await
            .context("Failed to delete old logs")?;

        Ok(result.rows_affected)
    }

    /// Gives the pages freed by a large delete back to the filesystem.
    pub async fn vacuum(&self) -> Result<(), DbErr> {
        self.conn.execute_unprepared("VACUUM").await?;
        Ok(())
    }
}

fn filtered(filter: &LogFilter) -> Select<ApiLogs> {
    let mut query = ApiLogs::find();

    if let Some(method) = &filter.method {
        query = query.filter(api_logs::Column::Method.eq(method.as_str()));
    }

    if let Some(path) = &filter.path {
        query = query.filter(api_logs::Column::Path.contains(path.as_str()));
    }

    if let Some(status) = filter.status_code {
        query = query.filter(api_logs::Column::StatusCode.eq(status));
    }

    if let Some(user_id) = filter.user_id {
        query = query.filter(api_logs::Column::UserId.eq(user_id));
    }

    if let Some(admin_id) = filter.admin_id {
        query = query.filter(api_logs::Column::AdminId.eq(admin_id));
    }

    query
}

fn newest_first(query: Select<ApiLogs>) -> Select<ApiLogs> {
    query
        .order_by_desc(api_logs::Column::CreatedAt)
        .order_by_desc(api_logs::Column::Id)
}

fn sql(text: &str) -> Statement {
    Statement::from_string(DbBackend::Sqlite, text.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
