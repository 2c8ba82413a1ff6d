//! 季節分類與季節調整

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use stock_core::{DemandObservation, Season, SeasonCalendar};

/// 套用在需求序列上的季節處理
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeasonalAdjustment {
    /// 篩選模式：只保留該季節月份的觀測
    Filtered(Season),
    /// 係數模式：平均需求乘上季節係數
    Factor(f64),
    /// 未調整（例如使用預設統計）
    None,
}

/// 季節分類器
#[derive(Debug, Clone)]
pub struct SeasonalClassifier {
    calendar: SeasonCalendar,
}

impl SeasonalClassifier {
    pub fn new(calendar: SeasonCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &SeasonCalendar {
        &self.calendar
    }

    /// 月份（1-12）所屬的季節
    pub fn season_of(&self, month: u32) -> Option<Season> {
        self.calendar.season_of(month)
    }

    /// 篩選模式：只保留月份屬於 `season` 的觀測
    pub fn filter(&self, observations: &[DemandObservation], season: Season) -> Vec<DemandObservation> {
        observations
            .iter()
            .filter(|o| self.calendar.contains(season, o.date))
            .copied()
            .collect()
    }

    /// 係數模式：參考月份的日平均需求 ÷ 各月日平均需求的平均
    ///
    /// 觀測數不足 `min_observations` 時回傳 1.0（不調整）；參考月份沒有資料時
    /// 以各月平均代替，結果同樣為 1.0。結果限制在 `bounds` 之內。
    pub fn factor(
        &self,
        observations: &[DemandObservation],
        reference_month: u32,
        min_observations: usize,
        bounds: (f64, f64),
    ) -> f64 {
        if observations.is_empty() || observations.len() < min_observations {
            return 1.0;
        }

        let mut by_month: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for obs in observations {
            let entry = by_month.entry(obs.date.month()).or_insert((0.0, 0));
            entry.0 += obs.quantity.to_f64().unwrap_or(0.0);
            entry.1 += 1;
        }

        let monthly_means: BTreeMap<u32, f64> = by_month
            .into_iter()
            .map(|(month, (sum, count))| (month, sum / count as f64))
            .collect();

        let overall = monthly_means.values().sum::<f64>() / monthly_means.len() as f64;
        if overall.is_nan() || overall <= 0.0 {
            return 1.0;
        }

        let reference = monthly_means
            .get(&reference_month)
            .copied()
            .unwrap_or(overall);

        clamp_factor(reference / overall, bounds)
    }
}

impl Default for SeasonalClassifier {
    fn default() -> Self {
        Self::new(SeasonCalendar::default())
    }
}

/// 將季節係數限制在 `[lower, upper]`
pub fn clamp_factor(raw: f64, bounds: (f64, f64)) -> f64 {
    let (lower, upper) = bounds;
    if raw.is_nan() {
        return 1.0;
    }
    raw.max(lower).min(upper)
}
