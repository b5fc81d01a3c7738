//! 候選解的結構修復與懲罰計分

use oil_core::{DecisionGrid, CO_ACTIVATION, VEGETABLE};

/// 結構修復：任一植物油啟用時，強制啟用第五種產品；兩者皆未啟用時則停用
///
/// 共同啟用規則因此對每個候選解都成立，不需要交給懲罰處理。
pub fn repair_co_activation(grid: &mut DecisionGrid) {
    for row in grid.rows_mut() {
        row[CO_ACTIVATION] = VEGETABLE.iter().any(|&o| row[o]);
    }
}

/// 每月啟用產品數超出 O_max 的總量
pub fn excess_activations(grid: &DecisionGrid, max_active: usize) -> usize {
    (0..grid.months())
        .map(|m| grid.active_count(m).saturating_sub(max_active))
        .sum()
}

/// 懲罰值：每個超出的月份累加 `punishment × (啟用數 − O_max)`，不設上限
pub fn penalty(grid: &DecisionGrid, max_active: usize, punishment: f64) -> f64 {
    (0..grid.months())
        .map(|m| grid.active_count(m))
        .filter(|&count| count > max_active)
        .map(|count| punishment * (count - max_active) as f64)
        .sum()
}
