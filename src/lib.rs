//! # Stock Forecast
//!
//! 臨界庫存預測引擎：依歷史消耗、季節與補貨期計算每個物料的建議安全庫存，
//! 並寫回庫存記錄。
//!
//! ```no_run
//! use std::sync::Arc;
//! use stock_forecast::{run_batch, ForecastConfig, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::open("inventory.db")?);
//! let summary = run_batch(store, ForecastConfig::default())?;
//! println!("processed {}", summary.processed());
//! # Ok::<(), stock_forecast::ForecastError>(())
//! ```

pub mod logging;

pub use stock_calc::{
    BatchOrchestrator, BatchState, BatchSummary, CancellationToken, ForecastWarning,
    MaterialFailure, StockCalculator, WarningKind,
};
pub use stock_core::{
    ForecastConfig, ForecastError, ForecastResult, ForecastStore, FormulaKind, RetentionPolicy,
    Result, Season, SeasonCalendar, SeasonSelection, StockBand,
};
pub use stock_store::{InMemoryStore, SqliteStore};

use std::sync::Arc;

/// 以目前時間對儲存中所有具有庫存記錄的物料執行一次批次
pub fn run_batch<S: ForecastStore>(store: Arc<S>, config: ForecastConfig) -> Result<BatchSummary> {
    let mut orchestrator = BatchOrchestrator::new(store, config)?;
    orchestrator.run()
}
