//! 儲存層介面
//!
//! 關聯式儲存由外部持久化層負責，預測引擎只透過以下介面讀寫。

use chrono::{DateTime, Utc};

use crate::demand::DemandRecord;
use crate::forecast::ForecastResult;
use crate::inventory::StockedMaterial;
use crate::Result;

/// 歷史需求來源
pub trait DemandSource {
    /// 已核准/已發貨請領單明細，依提交時間篩選 `[since, until]`
    fn request_demand(
        &self,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<DemandRecord>>;

    /// 出庫異動，依異動時間篩選 `[since, until]`
    fn movement_demand(
        &self,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<DemandRecord>>;
}

/// 提交結果：被覆寫前後的安全庫存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub previous_safety_stock: u32,
    pub new_safety_stock: u32,
}

/// 預測結果儲存
pub trait ForecastStore: DemandSource + Send + Sync {
    /// 所有具有庫存記錄的物料（依代碼排序）
    fn stocked_materials(&self) -> Result<Vec<StockedMaterial>>;

    /// 查詢單一物料；物料不存在或沒有庫存記錄時回傳 None
    fn find_stocked_material(&self, material_code: &str) -> Result<Option<StockedMaterial>>;

    /// 刪除所有預測結果，回傳刪除筆數
    fn purge_forecasts(&self) -> Result<usize>;

    /// 新增預測結果並覆寫該物料的安全庫存
    ///
    /// 兩個寫入屬於同一個工作單元：要嘛都成功，要嘛都不生效。
    fn commit_forecast(&self, result: &ForecastResult) -> Result<CommitReceipt>;

    /// 每個物料最新一次執行的預測結果
    fn latest_forecasts(&self) -> Result<Vec<ForecastResult>>;
}
