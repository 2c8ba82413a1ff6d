//! SQLite 儲存
//!
//! 數量與統計值以 TEXT 保存十進位字串，ID 以 TEXT 保存 UUID 字串。

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use stock_core::{
    CommitReceipt, DemandRecord, DemandSource, DemandSourceKind, ForecastError, ForecastResult,
    ForecastStore, InventoryRecord, Material, Movement, MovementKind, RequestLine, RequestStatus,
    Season, StockedMaterial,
};
use uuid::Uuid;

/// busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS material (
    code        TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    category    TEXT
);

CREATE TABLE IF NOT EXISTS inventory (
    material_code TEXT PRIMARY KEY REFERENCES material(code),
    current_stock INTEGER NOT NULL,
    safety_stock  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS request_line (
    id            TEXT PRIMARY KEY,
    material_code TEXT NOT NULL REFERENCES material(code),
    quantity      TEXT NOT NULL,
    submitted_at  TEXT NOT NULL,
    status        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS movement (
    id            TEXT PRIMARY KEY,
    material_code TEXT NOT NULL REFERENCES material(code),
    quantity      TEXT NOT NULL,
    occurred_at   TEXT NOT NULL,
    kind          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS forecast_result (
    id                       TEXT PRIMARY KEY,
    run_id                   TEXT NOT NULL,
    material_code            TEXT NOT NULL REFERENCES material(code),
    demand_mean              TEXT NOT NULL,
    demand_std_dev           TEXT NOT NULL,
    lead_time_days           INTEGER NOT NULL,
    recommended_safety_stock INTEGER NOT NULL,
    safety_buffer            TEXT NOT NULL,
    coefficient_of_variation TEXT NOT NULL,
    observation_count        INTEGER NOT NULL,
    season                   TEXT,
    method                   TEXT NOT NULL,
    method_label             TEXT NOT NULL,
    computed_at              TEXT NOT NULL,
    seq                      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_request_line_material ON request_line(material_code, submitted_at);
CREATE INDEX IF NOT EXISTS idx_movement_material ON movement(material_code, occurred_at);
CREATE INDEX IF NOT EXISTS idx_forecast_material ON forecast_result(material_code, computed_at);
"#;

const FORECAST_COLUMNS: &str = "id, run_id, material_code, demand_mean, demand_std_dev, \
     lead_time_days, recommended_safety_stock, safety_buffer, coefficient_of_variation, \
     observation_count, season, method, method_label, computed_at";

fn storage_error(e: rusqlite::Error) -> ForecastError {
    ForecastError::Storage(e.to_string())
}

fn status_code(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "Pending",
        RequestStatus::Approved => "Approved",
        RequestStatus::Dispatched => "Dispatched",
        RequestStatus::Rejected => "Rejected",
    }
}

fn kind_code(kind: MovementKind) -> &'static str {
    match kind {
        MovementKind::Inbound => "Inbound",
        MovementKind::Outbound => "Outbound",
    }
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn forecast_from_row(row: &Row<'_>) -> rusqlite::Result<ForecastResult> {
    let season = row
        .get::<_, Option<String>>(10)?
        .map(|s| Season::from_str(&s).map_err(|e| conversion_error(10, e)))
        .transpose()?;
    let observation_count: i64 = row.get(9)?;

    Ok(ForecastResult {
        id: uuid_at(row, 0)?,
        run_id: uuid_at(row, 1)?,
        material_code: row.get(2)?,
        demand_mean: decimal_at(row, 3)?,
        demand_std_dev: decimal_at(row, 4)?,
        lead_time_days: row.get(5)?,
        recommended_safety_stock: row.get(6)?,
        safety_buffer: decimal_at(row, 7)?,
        coefficient_of_variation: decimal_at(row, 8)?,
        observation_count: usize::try_from(observation_count).unwrap_or(0),
        season,
        method: row.get(11)?,
        method_label: row.get(12)?,
        computed_at: row.get(13)?,
    })
}

fn stocked_from_row(row: &Row<'_>) -> rusqlite::Result<StockedMaterial> {
    let code: String = row.get(0)?;
    Ok(StockedMaterial::new(
        Material {
            code: code.clone(),
            description: row.get(1)?,
            category: row.get(2)?,
        },
        InventoryRecord::new(code, row.get(3)?, row.get(4)?),
    ))
}

fn demand_from_row(source: DemandSourceKind) -> impl Fn(&Row<'_>) -> rusqlite::Result<DemandRecord> {
    move |row| {
        let occurred_at: DateTime<Utc> = row.get(0)?;
        let date: NaiveDate = occurred_at.date_naive();
        Ok(DemandRecord::new(date, decimal_at(row, 1)?, source))
    }
}

/// SQLite 儲存
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 打開資料庫檔案並建立資料表
    pub fn open(db_path: &str) -> stock_core::Result<Self> {
        let conn = Connection::open(db_path).map_err(storage_error)?;
        Self::from_connection(conn)
    }

    /// 記憶體資料庫（測試用）
    pub fn open_in_memory() -> stock_core::Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> stock_core::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(storage_error)?;
        conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
            .map_err(storage_error)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// 建立資料表（可重複執行）
    pub fn init_schema(&self) -> stock_core::Result<()> {
        self.get_conn()?
            .execute_batch(SCHEMA)
            .map_err(storage_error)
    }

    fn get_conn(&self) -> stock_core::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ForecastError::Storage(format!("連線鎖失敗: {e}")))
    }

    /// 新增物料與庫存記錄
    pub fn add_material(
        &self,
        material: &Material,
        inventory: Option<&InventoryRecord>,
    ) -> stock_core::Result<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction().map_err(storage_error)?;

        tx.execute(
            "INSERT INTO material (code, description, category) VALUES (?1, ?2, ?3)",
            params![material.code, material.description, material.category],
        )
        .map_err(storage_error)?;

        if let Some(record) = inventory {
            tx.execute(
                "INSERT INTO inventory (material_code, current_stock, safety_stock) VALUES (?1, ?2, ?3)",
                params![record.material_code, record.current_stock, record.safety_stock],
            )
            .map_err(storage_error)?;
        }

        tx.commit().map_err(storage_error)
    }

    pub fn add_request(&self, line: &RequestLine) -> stock_core::Result<()> {
        self.get_conn()?
            .execute(
                "INSERT INTO request_line (id, material_code, quantity, submitted_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    line.id.to_string(),
                    line.material_code,
                    line.quantity.to_string(),
                    line.submitted_at,
                    status_code(line.status),
                ],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    pub fn add_movement(&self, movement: &Movement) -> stock_core::Result<()> {
        self.get_conn()?
            .execute(
                "INSERT INTO movement (id, material_code, quantity, occurred_at, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    movement.id.to_string(),
                    movement.material_code,
                    movement.quantity.to_string(),
                    movement.occurred_at,
                    kind_code(movement.kind),
                ],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    pub fn inventory(&self, material_code: &str) -> stock_core::Result<Option<InventoryRecord>> {
        self.get_conn()?
            .query_row(
                "SELECT material_code, current_stock, safety_stock FROM inventory WHERE material_code = ?1",
                params![material_code],
                |row| Ok(InventoryRecord::new(row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(storage_error)
    }

    /// 預測結果總筆數
    pub fn forecast_count(&self) -> stock_core::Result<usize> {
        let count: i64 = self
            .get_conn()?
            .query_row("SELECT COUNT(*) FROM forecast_result", [], |row| row.get(0))
            .map_err(storage_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn query_demand(
        &self,
        sql: &str,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        source: DemandSourceKind,
    ) -> stock_core::Result<Vec<DemandRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql).map_err(storage_error)?;
        let records = stmt
            .query_map(params![material_code, since, until], demand_from_row(source))
            .map_err(storage_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_error)?;

        tracing::trace!("物料 {} {:?} 讀取 {} 筆", material_code, source, records.len());
        Ok(records)
    }
}

impl DemandSource for SqliteStore {
    fn request_demand(
        &self,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> stock_core::Result<Vec<DemandRecord>> {
        self.query_demand(
            "SELECT submitted_at, quantity FROM request_line
             WHERE material_code = ?1
               AND status IN ('Approved', 'Dispatched')
               AND submitted_at BETWEEN ?2 AND ?3",
            material_code,
            since,
            until,
            DemandSourceKind::RequestLine,
        )
    }

    fn movement_demand(
        &self,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> stock_core::Result<Vec<DemandRecord>> {
        self.query_demand(
            "SELECT occurred_at, quantity FROM movement
             WHERE material_code = ?1
               AND kind = 'Outbound'
               AND occurred_at BETWEEN ?2 AND ?3",
            material_code,
            since,
            until,
            DemandSourceKind::OutboundMovement,
        )
    }
}

impl ForecastStore for SqliteStore {
    fn stocked_materials(&self) -> stock_core::Result<Vec<StockedMaterial>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT m.code, m.description, m.category, i.current_stock, i.safety_stock
                 FROM material m
                 JOIN inventory i ON i.material_code = m.code
                 ORDER BY m.code",
            )
            .map_err(storage_error)?;

        let materials = stmt
            .query_map([], stocked_from_row)
            .map_err(storage_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_error)?;
        Ok(materials)
    }

    fn find_stocked_material(
        &self,
        material_code: &str,
    ) -> stock_core::Result<Option<StockedMaterial>> {
        self.get_conn()?
            .query_row(
                "SELECT m.code, m.description, m.category, i.current_stock, i.safety_stock
                 FROM material m
                 JOIN inventory i ON i.material_code = m.code
                 WHERE m.code = ?1",
                params![material_code],
                stocked_from_row,
            )
            .optional()
            .map_err(storage_error)
    }

    fn purge_forecasts(&self) -> stock_core::Result<usize> {
        let deleted = self
            .get_conn()?
            .execute("DELETE FROM forecast_result", [])
            .map_err(storage_error)?;
        tracing::debug!("刪除預測結果 {} 筆", deleted);
        Ok(deleted)
    }

    fn commit_forecast(&self, result: &ForecastResult) -> stock_core::Result<CommitReceipt> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction().map_err(storage_error)?;

        let previous: Option<u32> = tx
            .query_row(
                "SELECT safety_stock FROM inventory WHERE material_code = ?1",
                params![result.material_code],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)?;
        // 提前返回時 tx 被丟棄並自動回滾
        let previous_safety_stock =
            previous.ok_or_else(|| ForecastError::MaterialNotFound(result.material_code.clone()))?;

        let observation_count = i64::try_from(result.observation_count)
            .map_err(|e| ForecastError::Storage(e.to_string()))?;

        tx.execute(
            &format!(
                "INSERT INTO forecast_result ({FORECAST_COLUMNS}, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         (SELECT COALESCE(MAX(seq), 0) + 1 FROM forecast_result))"
            ),
            params![
                result.id.to_string(),
                result.run_id.to_string(),
                result.material_code,
                result.demand_mean.to_string(),
                result.demand_std_dev.to_string(),
                result.lead_time_days,
                result.recommended_safety_stock,
                result.safety_buffer.to_string(),
                result.coefficient_of_variation.to_string(),
                observation_count,
                result.season.map(|s| s.name()),
                result.method,
                result.method_label,
                result.computed_at,
            ],
        )
        .map_err(storage_error)?;

        tx.execute(
            "UPDATE inventory SET safety_stock = ?1 WHERE material_code = ?2",
            params![result.recommended_safety_stock, result.material_code],
        )
        .map_err(storage_error)?;

        tx.commit().map_err(storage_error)?;

        Ok(CommitReceipt {
            previous_safety_stock,
            new_safety_stock: result.recommended_safety_stock,
        })
    }

    fn latest_forecasts(&self) -> stock_core::Result<Vec<ForecastResult>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {FORECAST_COLUMNS} FROM forecast_result f
                 WHERE f.seq = (
                     SELECT MAX(g.seq) FROM forecast_result g
                     WHERE g.material_code = f.material_code
                       AND g.computed_at = (
                           SELECT MAX(h.computed_at) FROM forecast_result h
                           WHERE h.material_code = f.material_code
                       )
                 )
                 ORDER BY f.material_code"
            ))
            .map_err(storage_error)?;

        let results = stmt
            .query_map([], forecast_from_row)
            .map_err(storage_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_error)?;
        Ok(results)
    }
}
