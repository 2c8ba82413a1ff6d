//! 記憶體儲存

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use stock_core::{
    CommitReceipt, DemandRecord, DemandSource, ForecastError, ForecastResult, ForecastStore,
    InventoryRecord, Material, Movement, RequestLine, StockedMaterial,
};

#[derive(Debug, Default)]
struct StoreState {
    materials: BTreeMap<String, Material>,
    inventory: HashMap<String, InventoryRecord>,
    requests: Vec<RequestLine>,
    movements: Vec<Movement>,
    forecasts: Vec<ForecastResult>,
    failing_history: HashSet<String>,
}

/// 記憶體儲存
///
/// 提交在單一寫鎖內完成，結果與安全庫存同時生效。
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> stock_core::Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| ForecastError::Storage(format!("讀取鎖失敗: {e}")))
    }

    fn write(&self) -> stock_core::Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| ForecastError::Storage(format!("寫入鎖失敗: {e}")))
    }

    fn write_unpoisoned(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_unpoisoned(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// 新增物料；沒有庫存記錄的物料不參與批次
    pub fn add_material(&self, material: Material, inventory: Option<InventoryRecord>) {
        let mut state = self.write_unpoisoned();
        if let Some(record) = inventory {
            state.inventory.insert(material.code.clone(), record);
        }
        state.materials.insert(material.code.clone(), material);
    }

    pub fn add_request(&self, line: RequestLine) {
        self.write_unpoisoned().requests.push(line);
    }

    pub fn add_movement(&self, movement: Movement) {
        self.write_unpoisoned().movements.push(movement);
    }

    /// 讓指定物料的歷史讀取失敗（模擬儲存層錯誤）
    pub fn fail_history_for(&self, material_code: &str) {
        self.write_unpoisoned()
            .failing_history
            .insert(material_code.to_string());
    }

    pub fn inventory(&self, material_code: &str) -> Option<InventoryRecord> {
        self.read_unpoisoned().inventory.get(material_code).cloned()
    }

    /// 所有預測結果（依寫入順序）
    pub fn forecasts(&self) -> Vec<ForecastResult> {
        self.read_unpoisoned().forecasts.clone()
    }

    fn check_history(state: &StoreState, material_code: &str) -> stock_core::Result<()> {
        if state.failing_history.contains(material_code) {
            return Err(ForecastError::Storage(format!(
                "無法讀取物料 {material_code} 的歷史需求"
            )));
        }
        Ok(())
    }
}

impl DemandSource for InMemoryStore {
    fn request_demand(
        &self,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> stock_core::Result<Vec<DemandRecord>> {
        let state = self.read()?;
        Self::check_history(&state, material_code)?;

        Ok(state
            .requests
            .iter()
            .filter(|line| line.material_code == material_code)
            .filter(|line| line.status.counts_as_demand())
            .filter(|line| line.submitted_at >= since && line.submitted_at <= until)
            .map(DemandRecord::from)
            .collect())
    }

    fn movement_demand(
        &self,
        material_code: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> stock_core::Result<Vec<DemandRecord>> {
        let state = self.read()?;
        Self::check_history(&state, material_code)?;

        Ok(state
            .movements
            .iter()
            .filter(|m| m.material_code == material_code && m.is_outbound())
            .filter(|m| m.occurred_at >= since && m.occurred_at <= until)
            .map(DemandRecord::from)
            .collect())
    }
}

impl ForecastStore for InMemoryStore {
    fn stocked_materials(&self) -> stock_core::Result<Vec<StockedMaterial>> {
        let state = self.read()?;

        // BTreeMap 已依代碼排序
        Ok(state
            .materials
            .values()
            .filter_map(|material| {
                state
                    .inventory
                    .get(&material.code)
                    .map(|record| StockedMaterial::new(material.clone(), record.clone()))
            })
            .collect())
    }

    fn find_stocked_material(
        &self,
        material_code: &str,
    ) -> stock_core::Result<Option<StockedMaterial>> {
        let state = self.read()?;

        Ok(state.materials.get(material_code).and_then(|material| {
            state
                .inventory
                .get(material_code)
                .map(|record| StockedMaterial::new(material.clone(), record.clone()))
        }))
    }

    fn purge_forecasts(&self) -> stock_core::Result<usize> {
        let mut state = self.write()?;
        let count = state.forecasts.len();
        state.forecasts.clear();
        Ok(count)
    }

    fn commit_forecast(&self, result: &ForecastResult) -> stock_core::Result<CommitReceipt> {
        let mut state = self.write()?;

        let record = state
            .inventory
            .get_mut(&result.material_code)
            .ok_or_else(|| ForecastError::MaterialNotFound(result.material_code.clone()))?;

        let receipt = CommitReceipt {
            previous_safety_stock: record.safety_stock,
            new_safety_stock: result.recommended_safety_stock,
        };
        record.safety_stock = result.recommended_safety_stock;
        state.forecasts.push(result.clone());

        Ok(receipt)
    }

    fn latest_forecasts(&self) -> stock_core::Result<Vec<ForecastResult>> {
        let state = self.read()?;

        let mut latest: BTreeMap<&str, &ForecastResult> = BTreeMap::new();
        for result in &state.forecasts {
            match latest.get(result.material_code.as_str()) {
                Some(existing) if existing.computed_at > result.computed_at => {}
                _ => {
                    latest.insert(result.material_code.as_str(), result);
                }
            }
        }

        Ok(latest.into_values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use stock_core::RequestStatus;
    use uuid::Uuid;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap()
    }

    fn result_for(code: &str, quantity: u32, computed_at: DateTime<Utc>) -> ForecastResult {
        ForecastResult {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            material_code: code.to_string(),
            demand_mean: Decimal::new(500, 2),
            demand_std_dev: Decimal::new(200, 2),
            lead_time_days: 7,
            recommended_safety_stock: quantity,
            safety_buffer: Decimal::new(500, 2),
            coefficient_of_variation: Decimal::new(40, 2),
            observation_count: 0,
            season: None,
            method: "F:Cons | Hist:180d | Est:none".to_string(),
            method_label: "Default (no data)".to_string(),
            computed_at,
        }
    }

    fn store_with(code: &str, safety_stock: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.add_material(
            Material::new(code.to_string(), "test".to_string()),
            Some(InventoryRecord::new(code.to_string(), 10, safety_stock)),
        );
        store
    }

    #[test]
    fn test_request_demand_filters_status_and_window() {
        let store = store_with("GAS001", 0);
        for (day, status) in [
            (1, RequestStatus::Approved),
            (2, RequestStatus::Dispatched),
            (3, RequestStatus::Pending),
            (4, RequestStatus::Rejected),
            (20, RequestStatus::Approved),
        ] {
            store.add_request(RequestLine::new(
                "GAS001".to_string(),
                Decimal::from(2),
                at(day),
                status,
            ));
        }

        let records = store.request_demand("GAS001", at(1), at(10)).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_movement_demand_ignores_inbound() {
        let store = store_with("GAS001", 0);
        store.add_movement(Movement::outbound("GAS001".to_string(), Decimal::from(4), at(5)));
        store.add_movement(Movement::new(
            "GAS001".to_string(),
            Decimal::from(40),
            at(5),
            stock_core::MovementKind::Inbound,
        ));
        store.add_movement(Movement::outbound("CAB-01".to_string(), Decimal::from(1), at(5)));

        let records = store.movement_demand("GAS001", at(1), at(10)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, Decimal::from(4));
    }

    #[test]
    fn test_commit_updates_inventory_and_reports_previous() {
        let store = store_with("GAS001", 12);

        let receipt = store.commit_forecast(&result_for("GAS001", 159, at(1))).unwrap();

        assert_eq!(receipt.previous_safety_stock, 12);
        assert_eq!(receipt.new_safety_stock, 159);
        assert_eq!(store.inventory("GAS001").unwrap().safety_stock, 159);
        assert_eq!(store.forecasts().len(), 1);
    }

    #[test]
    fn test_commit_without_inventory_writes_nothing() {
        let store = InMemoryStore::new();
        store.add_material(Material::new("ORPHAN".to_string(), "x".to_string()), None);

        let err = store.commit_forecast(&result_for("ORPHAN", 5, at(1))).unwrap_err();

        assert!(matches!(err, ForecastError::MaterialNotFound(_)));
        assert!(store.forecasts().is_empty());
        assert!(store.stocked_materials().unwrap().is_empty());
    }

    #[test]
    fn test_latest_forecasts_per_material() {
        let store = store_with("GAS001", 0);
        store.add_material(
            Material::new("CAB-01".to_string(), "cable".to_string()),
            Some(InventoryRecord::new("CAB-01".to_string(), 0, 0)),
        );

        store.commit_forecast(&result_for("GAS001", 20, at(1))).unwrap();
        store.commit_forecast(&result_for("CAB-01", 10, at(1))).unwrap();
        store
            .commit_forecast(&result_for("GAS001", 30, at(1) + Duration::days(1)))
            .unwrap();

        let latest = store.latest_forecasts().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].material_code, "CAB-01");
        assert_eq!(latest[1].recommended_safety_stock, 30);

        assert_eq!(store.purge_forecasts().unwrap(), 3);
        assert!(store.latest_forecasts().unwrap().is_empty());
    }

    #[test]
    fn test_history_failure_injection() {
        let store = store_with("GAS001", 0);
        store.fail_history_for("GAS001");

        assert!(matches!(
            store.request_demand("GAS001", at(1), at(10)),
            Err(ForecastError::Storage(_))
        ));
        assert!(store.movement_demand("CAB-01", at(1), at(10)).is_ok());
    }
}
