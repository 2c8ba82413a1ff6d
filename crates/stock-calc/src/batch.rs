//! 批次協調器
//!
//! 對所有具有庫存記錄的物料計算建議安全庫存、寫入預測結果並覆寫庫存的安全庫存欄位。
//! 單一物料失敗不會中止批次；配置錯誤則在處理任何物料前就失敗。

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stock_core::{
    CommitReceipt, ForecastConfig, ForecastError, ForecastResult, ForecastStore, FormulaKind,
    RetentionPolicy, Season, StockBand, StockedMaterial,
};
use uuid::Uuid;

use crate::aggregation::DemandAggregator;
use crate::calculator::{RunPlan, StockCalculator};
use crate::ForecastWarning;

/// 批次狀態（沒有重試或續跑狀態）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    NotStarted,
    Running,
    Completed,
}

/// 協作式取消旗標：在物料之間檢查，不會中斷進行中的物料
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 單一物料的失敗紀錄
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialFailure {
    pub material_code: String,
    pub error: ForecastError,
}

/// 已提交的單一物料結果
#[derive(Debug)]
struct CommittedForecast {
    result: ForecastResult,
    receipt: CommitReceipt,
    warnings: Vec<ForecastWarning>,
}

/// 單一物料的處理結果；None 表示因取消而略過
type MaterialOutcome = Option<Result<CommittedForecast, MaterialFailure>>;

/// 批次執行摘要
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub formula: FormulaKind,
    pub season: Option<Season>,
    pub history_days: u32,
    pub service_level: f64,
    pub z_score: f64,

    /// 執行前刪除的舊結果筆數
    pub purged: usize,

    /// 參與批次的物料數
    pub materials_total: usize,

    /// 成功處理的結果（依物料代碼排序）
    pub results: Vec<ForecastResult>,

    /// 安全庫存實際變動的物料數
    pub changed: usize,

    /// 失敗的物料
    pub failures: Vec<MaterialFailure>,

    /// 因取消而未處理的物料數
    pub skipped: usize,

    pub warnings: Vec<ForecastWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: u128,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn was_cancelled(&self) -> bool {
        self.skipped > 0
    }

    /// 建議安全庫存的區間分佈
    pub fn band_distribution(&self) -> BTreeMap<StockBand, usize> {
        let mut bands = BTreeMap::new();
        for result in &self.results {
            *bands.entry(result.band()).or_insert(0) += 1;
        }
        bands
    }
}

/// 批次協調器
pub struct BatchOrchestrator<S: ForecastStore> {
    store: Arc<S>,
    calculator: StockCalculator,
    state: BatchState,
    cancellation: CancellationToken,
}

impl<S: ForecastStore> BatchOrchestrator<S> {
    /// 創建協調器；配置無效時立即失敗，不會有任何寫入
    pub fn new(store: Arc<S>, config: ForecastConfig) -> stock_core::Result<Self> {
        Ok(Self {
            store,
            calculator: StockCalculator::new(config)?,
            state: BatchState::NotStarted,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn config(&self) -> &ForecastConfig {
        self.calculator.config()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 取得取消旗標（可交給其他執行緒）
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// 以目前時間執行批次
    pub fn run(&mut self) -> stock_core::Result<BatchSummary> {
        self.run_at(Utc::now())
    }

    /// 以指定時間執行批次
    pub fn run_at(&mut self, now: DateTime<Utc>) -> stock_core::Result<BatchSummary> {
        if self.state != BatchState::NotStarted {
            return Err(ForecastError::InvalidState(format!(
                "批次已執行過（狀態: {:?}）",
                self.state
            )));
        }
        self.state = BatchState::Running;
        let outcome = self.execute(now);
        self.state = BatchState::Completed;
        outcome
    }

    fn execute(&self, now: DateTime<Utc>) -> stock_core::Result<BatchSummary> {
        let start_time = std::time::Instant::now();
        let config = self.calculator.config();
        let plan = RunPlan::new(config, now)?;

        // Step 1: 完整刷新（必須在任何物料寫入前完成）
        let purged = match config.retention {
            RetentionPolicy::PurgeBeforeRun => {
                let count = self.store.purge_forecasts()?;
                tracing::info!("清除舊預測結果 {} 筆", count);
                count
            }
            RetentionPolicy::KeepHistory => 0,
        };

        // Step 2: 物料清單
        let materials = self.store.stocked_materials()?;

        tracing::info!("========== 開始臨界庫存計算 ==========");
        tracing::info!("執行ID: {}", plan.run_id);
        tracing::info!("季節: {}", plan.season_label());
        tracing::info!("公式: {}", config.formula.label());
        tracing::info!("歷史天數: {}", config.history_days);
        tracing::info!(
            "服務水準: {} (z = {})",
            config.service_level,
            self.calculator.parameters().z_score
        );
        tracing::info!("待處理物料: {}", materials.len());

        // Step 3: 逐物料計算
        let outcomes = self.process_all(&materials, &plan)?;

        let mut summary = BatchSummary {
            run_id: plan.run_id,
            run_at: now,
            formula: config.formula,
            season: plan.season,
            history_days: config.history_days,
            service_level: config.service_level,
            z_score: self.calculator.parameters().z_score,
            purged,
            materials_total: materials.len(),
            results: Vec::new(),
            changed: 0,
            failures: Vec::new(),
            skipped: 0,
            warnings: Vec::new(),
            calculation_time_ms: 0,
        };

        for outcome in outcomes {
            match outcome {
                Some(Ok(committed)) => {
                    let receipt = committed.receipt;
                    if receipt.previous_safety_stock != receipt.new_safety_stock {
                        summary.changed += 1;
                    }
                    summary.results.push(committed.result);
                    summary.warnings.extend(committed.warnings);
                }
                Some(Err(failure)) => summary.failures.push(failure),
                None => summary.skipped += 1,
            }
        }
        summary.calculation_time_ms = start_time.elapsed().as_millis();

        // Step 4: 摘要
        tracing::info!("========== 計算完成 ==========");
        tracing::info!("成功處理: {}", summary.processed());
        tracing::info!("安全庫存變動: {}", summary.changed);
        tracing::info!("錯誤: {}", summary.error_count());
        if summary.was_cancelled() {
            tracing::warn!("批次已取消，未處理物料: {}", summary.skipped);
        }
        tracing::info!("耗時 {} ms", summary.calculation_time_ms);

        Ok(summary)
    }

    /// 依工作執行緒數量循序或平行處理（結果順序與輸入一致）
    fn process_all(
        &self,
        materials: &[StockedMaterial],
        plan: &RunPlan,
    ) -> stock_core::Result<Vec<MaterialOutcome>> {
        let workers = self.calculator.config().workers;
        if workers <= 1 {
            return Ok(materials.iter().map(|m| self.process(m, plan)).collect());
        }

        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ForecastError::WorkerPool(e.to_string()))?;

        tracing::debug!("使用 {} 個工作執行緒", workers);

        Ok(pool.install(|| {
            materials
                .par_iter()
                .map(|m| self.process(m, plan))
                .collect()
        }))
    }

    fn process(&self, material: &StockedMaterial, plan: &RunPlan) -> MaterialOutcome {
        if self.cancellation.is_cancelled() {
            return None;
        }

        Some(self.forecast_one(material, plan).map_err(|error| {
            tracing::error!("計算物料 {} 臨界庫存失敗: {}", material.code(), error);
            MaterialFailure {
                material_code: material.code().to_string(),
                error,
            }
        }))
    }

    /// 單一物料：讀取歷史 → 計算 → 提交（結果與安全庫存一併寫入）
    fn forecast_one(
        &self,
        material: &StockedMaterial,
        plan: &RunPlan,
    ) -> stock_core::Result<CommittedForecast> {
        let code = material.code();
        let history = DemandAggregator::load(self.store.as_ref(), code, &plan.window)?;
        let forecast = self.calculator.calculate(code, &history, plan);
        let result = self.calculator.to_result(&forecast, plan);
        let receipt = self.store.commit_forecast(&result)?;

        tracing::info!(
            "✓ 物料 {} 安全庫存: {} -> {}",
            code,
            receipt.previous_safety_stock,
            receipt.new_safety_stock
        );

        Ok(CommittedForecast {
            result,
            receipt,
            warnings: forecast.warnings,
        })
    }

    /// 重新計算單一物料（不影響批次狀態）
    pub fn forecast_material(
        &self,
        material_code: &str,
        now: DateTime<Utc>,
    ) -> stock_core::Result<ForecastResult> {
        let material = self
            .store
            .find_stocked_material(material_code)?
            .ok_or_else(|| ForecastError::MaterialNotFound(material_code.to_string()))?;

        let plan = RunPlan::new(self.calculator.config(), now)?;
        Ok(self.forecast_one(&material, &plan)?.result)
    }
}
