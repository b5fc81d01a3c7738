//! 庫存平衡重算

use oil_core::{ScenarioData, O_NUM};
use serde::{Deserialize, Serialize};

use crate::PlanSolution;

/// 單月單產品的庫存平衡記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    /// 月份索引
    pub month: usize,
    /// 產品索引
    pub product: usize,
    /// 期初庫存（上月重算結果）
    pub opening: f64,
    /// 採購量
    pub purchased: f64,
    /// 使用量
    pub used: f64,
    /// 重算的月底庫存
    pub projected: f64,
    /// 求解器回報的月底庫存
    pub reported: f64,
}

impl StorageRecord {
    /// 重算值與回報值之差
    pub fn residual(&self) -> f64 {
        (self.projected - self.reported).abs()
    }
}

/// 以 s[m] = s[m−1] − y[m] + x[m] 逐月重算庫存
#[derive(Debug, Clone)]
pub struct StorageLedger {
    records: Vec<StorageRecord>,
    storage_stop: f64,
}

impl StorageLedger {
    /// 從期初庫存開始，依採購與使用量重算整個規劃期
    pub fn replay(solution: &PlanSolution, scenario: &ScenarioData) -> Self {
        let mut records = Vec::with_capacity(solution.months() * O_NUM);
        let mut on_hand = [scenario.storage_start; O_NUM];

        for month in 0..solution.months() {
            for product in 0..O_NUM {
                let opening = on_hand[product];
                let purchased = solution.purchased[month][product];
                let used = solution.used[month][product];
                let projected = opening - used + purchased;

                records.push(StorageRecord {
                    month,
                    product,
                    opening,
                    purchased,
                    used,
                    projected,
                    reported: solution.stored[month][product],
                });

                on_hand[product] = projected;
            }
        }

        Self {
            records,
            storage_stop: scenario.storage_stop,
        }
    }

    /// 依月份、產品排列的逐筆庫存記錄
    pub fn records(&self) -> &[StorageRecord] {
        &self.records
    }

    /// 重算的月底庫存
    pub fn projected(&self, month: usize, product: usize) -> Option<f64> {
        self.records
            .iter()
            .find(|r| r.month == month && r.product == product)
            .map(|r| r.projected)
    }

    /// 所有記錄中最大的重算差異
    pub fn max_residual(&self) -> f64 {
        self.records
            .iter()
            .map(StorageRecord::residual)
            .fold(0.0, f64::max)
    }

    /// 期末重算庫存與 So_stop 的最大差距
    pub fn end_gap(&self) -> f64 {
        let Some(last) = self.records.last().map(|r| r.month) else {
            return 0.0;
        };

        self.records
            .iter()
            .filter(|r| r.month == last)
            .map(|r| (r.projected - self.storage_stop).abs())
            .fold(0.0, f64::max)
    }

    /// 在容差內是否守恆且符合期末條件
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        self.max_residual() <= tolerance && self.end_gap() <= tolerance
    }
}
