//! 季節性批次計算範例
//!
//! 以隨機產生的 180 天出庫與請領紀錄建立記憶體儲存，執行一次批次並列出結果

use chrono::{Datelike, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::sync::Arc;
use stock_core::{InventoryRecord, Material, Movement, RequestLine, RequestStatus};
use stock_forecast::{
    logging, BatchOrchestrator, ForecastConfig, FormulaKind, InMemoryStore, StockBand,
};

/// (代碼, 描述, 日平均消耗, 出現需求的機率)
const CATALOG: &[(&str, &str, u32, f64)] = &[
    ("GAS-R410A", "Refrigerant R410A 11.3kg", 3, 0.6),
    ("GAS-R22", "Refrigerant R22 13.6kg", 1, 0.2),
    ("CAB-2X1.5", "Cable 2x1.5mm", 25, 0.9),
    ("COMP-1HP", "Compressor 1HP", 1, 0.05),
    ("VALV-EXP", "Expansion valve", 4, 0.7),
    ("TAPE-ALU", "Aluminium tape", 8, 0.8),
    ("FILT-HEPA", "HEPA filter", 2, 0.4),
];

fn main() -> anyhow::Result<()> {
    logging::init();
    println!("===== Seasonal Critical-Stock Batch =====\n");

    let now = Utc.with_ymd_and_hms(2025, 7, 31, 18, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    // 步驟 1: 建立物料與庫存
    println!("[1] Seed materials");
    let store = Arc::new(InMemoryStore::new());
    for &(code, description, _, _) in CATALOG {
        store.add_material(
            Material::new(code.to_string(), description.to_string()),
            Some(InventoryRecord::new(code.to_string(), rng.gen_range(0..200), 0)),
        );
    }
    store.add_material(
        Material::new("SRV-VISIT".to_string(), "Service visit (no stock)".to_string()),
        None,
    );
    println!("    {} stocked materials\n", CATALOG.len());

    // 步驟 2: 產生歷史消耗（冬季需求加倍）
    println!("[2] Generate 180 days of history");
    let mut records = 0;
    for day in 1..=180 {
        let at = now - Duration::days(day);
        let winter_boost = if (6..=8).contains(&at.month()) { 2 } else { 1 };

        for &(code, _, daily_mean, probability) in CATALOG {
            if !rng.gen_bool(probability) {
                continue;
            }
            let quantity = rng.gen_range(1..=daily_mean * 2) * winter_boost;

            if rng.gen_bool(0.5) {
                store.add_movement(Movement::outbound(
                    code.to_string(),
                    Decimal::from(quantity),
                    at,
                ));
            } else {
                store.add_request(RequestLine::new(
                    code.to_string(),
                    Decimal::from(quantity),
                    at,
                    RequestStatus::Dispatched,
                ));
            }
            records += 1;
        }
    }
    println!("    {records} demand records\n");

    // 步驟 3: 執行批次
    println!("[3] Run batch (standard ROP, auto season)");
    let config = ForecastConfig::default()
        .with_formula(FormulaKind::Standard)
        .with_workers(2);
    let mut orchestrator = BatchOrchestrator::new(store.clone(), config)?;
    let summary = orchestrator.run_at(now)?;

    println!(
        "    Season: {}",
        summary
            .season
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("    Processed: {}", summary.processed());
    println!("    Errors: {}", summary.error_count());
    println!("    Warnings: {}\n", summary.warnings.len());

    // 步驟 4: 結果
    println!("[4] Results");
    println!(
        "    {:<12} {:>6} {:>6} {:>4} {:>6}  {}",
        "Material", "Mean", "Std", "LT", "SS", "Method"
    );
    for result in &summary.results {
        println!(
            "    {:<12} {:>6} {:>6} {:>4} {:>6}  {}",
            result.material_code,
            result.demand_mean,
            result.demand_std_dev,
            result.lead_time_days,
            result.recommended_safety_stock,
            result.method
        );
    }

    println!("\n[5] Safety stock distribution");
    let bands = summary.band_distribution();
    for band in StockBand::ALL {
        println!("    {:>6}: {}", band, bands.get(&band).copied().unwrap_or(0));
    }

    println!("\n[6] Below safety stock");
    for result in &summary.results {
        if let Some(inventory) = store.inventory(&result.material_code) {
            if inventory.is_below_safety_stock() {
                println!(
                    "    {}: stock {} < {} (need {})",
                    result.material_code,
                    inventory.current_stock,
                    inventory.safety_stock,
                    inventory.replenishment_needed()
                );
            }
        }
    }

    println!("\n===== Done in {} ms =====", summary.calculation_time_ms);
    Ok(())
}
