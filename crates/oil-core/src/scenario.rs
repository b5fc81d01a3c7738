//! 規劃情境資料模型

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{OilError, Result, O_NUM};

/// 規劃情境（單次執行內不可變）
///
/// 欄位名稱沿用資料檔的原始拼寫（`M`、`O_max`、`So_max` ...）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// 規劃月數
    #[serde(rename = "M")]
    pub months: usize,

    /// 每月最多同時使用的產品數
    #[serde(rename = "O_max")]
    pub max_active_products: usize,

    /// 每種產品的最大庫存量
    #[serde(rename = "So_max")]
    pub storage_capacity: f64,

    /// 期初庫存
    #[serde(rename = "So_start")]
    pub storage_start: f64,

    /// 期末庫存
    #[serde(rename = "So_stop")]
    pub storage_stop: f64,

    /// 植物油每月最大精煉量
    #[serde(rename = "Yv_max")]
    pub vegetable_capacity: f64,

    /// 非植物油每月最大精煉量
    #[serde(rename = "Yo_max")]
    pub non_vegetable_capacity: f64,

    /// 各產品硬度
    #[serde(rename = "H")]
    pub hardness: [f64; O_NUM],

    /// 最低硬度
    #[serde(rename = "H_min")]
    pub hardness_min: f64,

    /// 最高硬度
    #[serde(rename = "H_max")]
    pub hardness_max: f64,

    /// 啟用時的最低使用量
    #[serde(rename = "Y_min")]
    pub min_usage: f64,

    /// 連結二元決策與使用量的大常數
    #[serde(rename = "A")]
    pub big_m: f64,

    /// 單位庫存成本
    #[serde(rename = "C_store")]
    pub storage_cost: f64,

    /// 成品單位售價
    #[serde(rename = "P_mix")]
    pub sale_price: f64,

    /// 每月每產品採購成本 `C[M][O]`
    #[serde(rename = "C")]
    pub purchase_cost: Vec<[f64; O_NUM]>,
}

impl ScenarioData {
    /// 以採購成本矩陣創建情境，其餘參數採用標準食用油混合問題的數值
    pub fn new(purchase_cost: Vec<[f64; O_NUM]>) -> Self {
        Self {
            months: purchase_cost.len(),
            max_active_products: 3,
            storage_capacity: 1000.0,
            storage_start: 500.0,
            storage_stop: 500.0,
            vegetable_capacity: 200.0,
            non_vegetable_capacity: 250.0,
            hardness: [8.8, 6.1, 2.0, 4.2, 5.0],
            hardness_min: 3.0,
            hardness_max: 6.0,
            min_usage: 20.0,
            big_m: 1000.0,
            storage_cost: 5.0,
            sale_price: 150.0,
            purchase_cost,
        }
    }

    /// 標準六個月食用油混合情境
    pub fn food_manufacture() -> Self {
        Self::new(vec![
            [110.0, 120.0, 130.0, 110.0, 115.0],
            [130.0, 130.0, 110.0, 90.0, 115.0],
            [110.0, 140.0, 130.0, 100.0, 95.0],
            [120.0, 110.0, 120.0, 120.0, 125.0],
            [100.0, 120.0, 150.0, 110.0, 105.0],
            [90.0, 100.0, 140.0, 80.0, 135.0],
        ])
    }

    /// 建構器模式：設置每月最多使用產品數
    pub fn with_max_active_products(mut self, max_active: usize) -> Self {
        self.max_active_products = max_active;
        self
    }

    /// 建構器模式：設置庫存容量與期初/期末庫存
    pub fn with_storage(mut self, capacity: f64, start: f64, stop: f64) -> Self {
        self.storage_capacity = capacity;
        self.storage_start = start;
        self.storage_stop = stop;
        self
    }

    /// 建構器模式：設置精煉產能
    pub fn with_capacities(mut self, vegetable: f64, non_vegetable: f64) -> Self {
        self.vegetable_capacity = vegetable;
        self.non_vegetable_capacity = non_vegetable;
        self
    }

    /// 建構器模式：設置硬度資料
    pub fn with_hardness(mut self, hardness: [f64; O_NUM], min: f64, max: f64) -> Self {
        self.hardness = hardness;
        self.hardness_min = min;
        self.hardness_max = max;
        self
    }

    /// 建構器模式：設置最低使用量
    pub fn with_min_usage(mut self, min_usage: f64) -> Self {
        self.min_usage = min_usage;
        self
    }

    /// 建構器模式：設置大常數 A
    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = big_m;
        self
    }

    /// 建構器模式：設置售價與庫存成本
    pub fn with_prices(mut self, sale_price: f64, storage_cost: f64) -> Self {
        self.sale_price = sale_price;
        self.storage_cost = storage_cost;
        self
    }

    /// 從 JSON 字串載入並驗證
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)
            .map_err(|e| OilError::Configuration(format!("情境資料格式錯誤: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// 從 JSON 檔案載入並驗證
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 決策基因數量（M × 產品數）
    pub fn num_genes(&self) -> usize {
        self.months * O_NUM
    }

    /// 最後一個月的索引
    pub fn last_month(&self) -> usize {
        self.months.saturating_sub(1)
    }

    /// 驗證情境資料
    pub fn validate(&self) -> Result<()> {
        if self.months == 0 {
            return Err(OilError::Configuration("規劃月數 M 必須至少為 1".to_string()));
        }

        if self.purchase_cost.len() != self.months {
            return Err(OilError::Configuration(format!(
                "採購成本矩陣應有 {} 列，實際為 {} 列",
                self.months,
                self.purchase_cost.len()
            )));
        }

        let scalars = [
            ("So_max", self.storage_capacity),
            ("So_start", self.storage_start),
            ("So_stop", self.storage_stop),
            ("Yv_max", self.vegetable_capacity),
            ("Yo_max", self.non_vegetable_capacity),
            ("Y_min", self.min_usage),
            ("A", self.big_m),
            ("C_store", self.storage_cost),
            ("P_mix", self.sale_price),
        ];
        for (name, value) in scalars {
            if !value.is_finite() || value < 0.0 {
                return Err(OilError::Configuration(format!(
                    "{} 必須為非負有限數值，實際為 {}",
                    name, value
                )));
            }
        }

        for (month, row) in self.purchase_cost.iter().enumerate() {
            if row.iter().any(|c| !c.is_finite() || *c < 0.0) {
                return Err(OilError::Configuration(format!(
                    "第 {} 個月的採購成本必須為非負有限數值",
                    month + 1
                )));
            }
        }

        if self
            .hardness
            .iter()
            .chain([self.hardness_min, self.hardness_max].iter())
            .any(|h| !h.is_finite())
        {
            return Err(OilError::Configuration("硬度資料必須為有限數值".to_string()));
        }

        if self.hardness_min > self.hardness_max {
            return Err(OilError::Configuration(format!(
                "H_min ({}) 不可大於 H_max ({})",
                self.hardness_min, self.hardness_max
            )));
        }

        Ok(())
    }
}
