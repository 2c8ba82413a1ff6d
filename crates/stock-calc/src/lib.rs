//! # Stock Forecast Calculation Engine
//!
//! 臨界庫存預測計算引擎：歷史需求彙總、季節處理、再訂購點公式與批次協調

pub mod aggregation;
pub mod batch;
pub mod calculator;
pub mod floor;
pub mod lead_time;
pub mod reorder;
pub mod seasonal;
pub mod statistics;

// Re-export 主要類型
pub use aggregation::{DemandAggregator, HistoryWindow};
pub use batch::{BatchOrchestrator, BatchState, BatchSummary, CancellationToken, MaterialFailure};
pub use calculator::{MaterialForecast, RunPlan, StockCalculator};
pub use floor::FloorEnforcer;
pub use lead_time::LeadTimeEstimator;
pub use reorder::{FormulaParameters, ReorderPoint, ReorderPointCalculator};
pub use seasonal::{SeasonalAdjustment, SeasonalClassifier};
pub use statistics::{DemandStatistics, Dispersion};

/// 預測警告（不計入錯誤數）
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastWarning {
    pub material_code: String,
    pub kind: WarningKind,
    pub message: String,
}

impl ForecastWarning {
    pub fn new(material_code: String, kind: WarningKind, message: String) -> Self {
        Self {
            material_code,
            kind,
            message,
        }
    }

    /// 歷史觀測不足，改用預設統計
    pub fn insufficient_history(material_code: &str, observations: usize, required: usize) -> Self {
        Self::new(
            material_code.to_string(),
            WarningKind::InsufficientHistory,
            format!("日觀測數 {observations} 少於 {required}，使用預設值"),
        )
    }

    /// 標準差無法定義，以平均值比例代替
    pub fn undefined_dispersion(material_code: &str, substitute: f64) -> Self {
        Self::new(
            material_code.to_string(),
            WarningKind::UndefinedDispersion,
            format!("標準差為零或無法定義，改用 {substitute:.2}"),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    InsufficientHistory,
    UndefinedDispersion,
}
