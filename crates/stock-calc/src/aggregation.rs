//! 歷史需求彙總

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use stock_core::{DemandObservation, DemandRecord, DemandSource, ForecastError};

/// 回溯區間 `[since, until]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl HistoryWindow {
    /// 以 `now` 為結尾、往前 `days` 天的區間；起點超出可表示的時間範圍時視為配置錯誤
    pub fn ending_at(now: DateTime<Utc>, days: u32) -> stock_core::Result<Self> {
        let since = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                ForecastError::InvalidConfig(format!("回溯 {days} 天超出可表示的日期範圍"))
            })?;

        Ok(Self { since, until: now })
    }
}

/// 需求彙總器
pub struct DemandAggregator;

impl DemandAggregator {
    /// 讀取兩個來源並合併為每日需求
    ///
    /// 任一來源為空時只使用另一個來源；兩者皆空時回傳空列表。
    pub fn load<S: DemandSource + ?Sized>(
        source: &S,
        material_code: &str,
        window: &HistoryWindow,
    ) -> stock_core::Result<Vec<DemandObservation>> {
        let requests = source.request_demand(material_code, window.since, window.until)?;
        let movements = source.movement_demand(material_code, window.since, window.until)?;

        tracing::debug!(
            "物料 {} 歷史需求：請領 {} 筆，出庫 {} 筆",
            material_code,
            requests.len(),
            movements.len()
        );

        Ok(Self::merge(&requests, &movements))
    }

    /// 合併兩個來源，同一天的數量相加（依日期排序）
    pub fn merge(requests: &[DemandRecord], movements: &[DemandRecord]) -> Vec<DemandObservation> {
        let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

        for record in requests.iter().chain(movements) {
            *daily.entry(record.date).or_insert(Decimal::ZERO) += record.quantity;
        }

        // 只保留有消耗的日期
        daily
            .into_iter()
            .filter(|(_, quantity)| *quantity > Decimal::ZERO)
            .map(|(date, quantity)| DemandObservation::new(date, quantity))
            .collect()
    }
}
