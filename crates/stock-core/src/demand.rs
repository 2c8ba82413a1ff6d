//! 需求模型
//!
//! 兩個歷史資料來源：已核准/已發貨的請領單明細，以及出庫異動。

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 請領單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Dispatched,
    Rejected,
}

impl RequestStatus {
    /// 只有已核准或已發貨的請領單算作需求
    pub fn counts_as_demand(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Dispatched)
    }
}

/// 請領單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLine {
    /// 明細ID
    pub id: Uuid,

    /// 物料代碼
    pub material_code: String,

    /// 請領數量
    pub quantity: Decimal,

    /// 請領單提交時間
    pub submitted_at: DateTime<Utc>,

    /// 請領單狀態
    pub status: RequestStatus,
}

impl RequestLine {
    /// 創建新的請領單明細
    pub fn new(
        material_code: String,
        quantity: Decimal,
        submitted_at: DateTime<Utc>,
        status: RequestStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            material_code,
            quantity,
            submitted_at,
            status,
        }
    }
}

/// 庫存異動類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    /// 入庫
    Inbound,
    /// 出庫
    Outbound,
}

/// 庫存異動
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    /// 異動ID
    pub id: Uuid,

    /// 物料代碼
    pub material_code: String,

    /// 數量
    pub quantity: Decimal,

    /// 異動時間
    pub occurred_at: DateTime<Utc>,

    /// 異動類型
    pub kind: MovementKind,
}

impl Movement {
    /// 創建新的庫存異動
    pub fn new(
        material_code: String,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        kind: MovementKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            material_code,
            quantity,
            occurred_at,
            kind,
        }
    }

    /// 創建出庫異動
    pub fn outbound(material_code: String, quantity: Decimal, occurred_at: DateTime<Utc>) -> Self {
        Self::new(material_code, quantity, occurred_at, MovementKind::Outbound)
    }

    pub fn is_outbound(&self) -> bool {
        self.kind == MovementKind::Outbound
    }
}

/// 需求來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemandSourceKind {
    /// 請領單明細
    RequestLine,
    /// 出庫異動
    OutboundMovement,
}

/// 單筆需求紀錄（來源資料讀取層的輸出，同一天可能有多筆）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    /// 需求日期
    pub date: NaiveDate,

    /// 數量
    pub quantity: Decimal,

    /// 來源
    pub source: DemandSourceKind,
}

impl DemandRecord {
    pub fn new(date: NaiveDate, quantity: Decimal, source: DemandSourceKind) -> Self {
        Self {
            date,
            quantity,
            source,
        }
    }
}

impl From<&RequestLine> for DemandRecord {
    fn from(line: &RequestLine) -> Self {
        Self::new(
            line.submitted_at.date_naive(),
            line.quantity,
            DemandSourceKind::RequestLine,
        )
    }
}

impl From<&Movement> for DemandRecord {
    fn from(movement: &Movement) -> Self {
        Self::new(
            movement.occurred_at.date_naive(),
            movement.quantity,
            DemandSourceKind::OutboundMovement,
        )
    }
}

/// 每日需求觀測值（合併兩個來源後的結果，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandObservation {
    /// 日期
    pub date: NaiveDate,

    /// 當日總消耗量（> 0）
    pub quantity: Decimal,
}

impl DemandObservation {
    pub fn new(date: NaiveDate, quantity: Decimal) -> Self {
        Self { date, quantity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_status_counts_as_demand() {
        assert!(RequestStatus::Approved.counts_as_demand());
        assert!(RequestStatus::Dispatched.counts_as_demand());
        assert!(!RequestStatus::Pending.counts_as_demand());
        assert!(!RequestStatus::Rejected.counts_as_demand());
    }

    #[test]
    fn test_records_are_keyed_by_calendar_day() {
        let submitted = Utc.with_ymd_and_hms(2025, 1, 1, 23, 30, 0).unwrap();
        let line = RequestLine::new(
            "GAS001".to_string(),
            Decimal::from(3),
            submitted,
            RequestStatus::Approved,
        );
        let record = DemandRecord::from(&line);

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(record.quantity, Decimal::from(3));
        assert_eq!(record.source, DemandSourceKind::RequestLine);

        let movement = Movement::outbound("GAS001".to_string(), Decimal::from(4), submitted);
        assert!(movement.is_outbound());
        assert_eq!(
            DemandRecord::from(&movement).source,
            DemandSourceKind::OutboundMovement
        );
    }
}
