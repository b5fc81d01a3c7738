//! # Oil Core
//!
//! 核心資料模型與類型定義（情境資料、搜尋配置、使用決策矩陣）

pub mod decision;
pub mod scenario;
pub mod search_config;

// Re-export 主要類型
pub use decision::DecisionGrid;
pub use scenario::ScenarioData;
pub use search_config::{SearchConfig, StopCriterion};

/// 產品數量（固定）
pub const O_NUM: usize = 5;

/// 植物油產品索引
pub const VEGETABLE: [usize; 2] = [0, 1];

/// 非植物油產品索引
pub const NON_VEGETABLE: [usize; 3] = [2, 3, 4];

/// 共同啟用產品索引（任一植物油啟用時必須啟用）
pub const CO_ACTIVATION: usize = 4;

/// 月份標籤
pub fn month_label(month: usize) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    MONTHS
        .get(month)
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("M{}", month + 1))
}

/// 產品標籤（VEG1、VEG2、OIL1..OIL3）
pub fn product_label(product: usize) -> String {
    if product < VEGETABLE.len() {
        format!("VEG{}", product + 1)
    } else {
        format!("OIL{}", product - 1)
    }
}

/// 規劃錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OilError {
    #[error("配置錯誤: {0}")]
    Configuration(String),

    #[error("找不到可行解")]
    NoSolution,

    #[error("模型尚未宣告: {0}")]
    ModelNotDeclared(&'static str),

    #[error("模型已宣告: {0}")]
    ModelAlreadyDeclared(&'static str),

    #[error("無效的決策矩陣: {0}")]
    InvalidDecisionGrid(String),

    #[error("讀取檔案失敗: {0}")]
    Io(String),

    #[error("序列化錯誤: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for OilError {
    fn from(err: std::io::Error) -> Self {
        OilError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OilError {
    fn from(err: serde_json::Error) -> Self {
        OilError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(month_label(0), "Jan");
        assert_eq!(month_label(5), "Jun");
        assert_eq!(month_label(12), "M13");
        assert_eq!(product_label(0), "VEG1");
        assert_eq!(product_label(1), "VEG2");
        assert_eq!(product_label(2), "OIL1");
        assert_eq!(product_label(4), "OIL3");
    }

    #[test]
    fn test_product_groups_cover_all_products() {
        let mut all: Vec<usize> = VEGETABLE.iter().chain(NON_VEGETABLE.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..O_NUM).collect::<Vec<_>>());
        assert!(NON_VEGETABLE.contains(&CO_ACTIVATION));
    }
}
