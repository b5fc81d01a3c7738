//! # Oil Heuristic Search
//!
//! 二元使用決策的遺傳搜尋；適應度由固定決策模式的規劃模型求得

pub mod evaluator;
pub mod population;
pub mod repair;
pub mod search;

use oil_core::DecisionGrid;
use serde::{Deserialize, Serialize};

// Re-export 主要類型
pub use evaluator::{CandidateEvaluator, Evaluation, EvaluationOutcome, FixedDecisionEvaluator};
pub use repair::{penalty, repair_co_activation};
pub use search::HeuristicSearch;

/// 評估統計（僅供觀察，不影響搜尋）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// 已評估的候選解
    pub evaluated: u64,
    /// 因違反產品數上限而懲罰的候選解
    pub penalized: u64,
    /// 交給求解器的候選解
    pub delegated: u64,
    /// 求解器無解的候選解
    pub infeasible: u64,
    /// 無法解碼、未交給求解器的候選解
    pub undecodable: u64,
}

impl SearchStats {
    /// 記錄一次評估
    pub fn record(&mut self, evaluation: &Evaluation) {
        self.evaluated += 1;
        match evaluation.outcome {
            EvaluationOutcome::Penalized => self.penalized += 1,
            EvaluationOutcome::Solved => self.delegated += 1,
            EvaluationOutcome::Infeasible => {
                self.delegated += 1;
                self.infeasible += 1;
            }
            EvaluationOutcome::Undecodable => self.undecodable += 1,
        }
    }

    /// 合併另一份統計
    pub fn merge(&mut self, other: &SearchStats) {
        self.evaluated += other.evaluated;
        self.penalized += other.penalized;
        self.delegated += other.delegated;
        self.infeasible += other.infeasible;
        self.undecodable += other.undecodable;
    }
}

impl std::fmt::Display for SearchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "評估 {}，懲罰 {}，求解 {}，不可行 {}，無法解碼 {}",
            self.evaluated, self.penalized, self.delegated, self.infeasible, self.undecodable
        )
    }
}

/// 搜尋結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 最佳基因（未修復）
    pub best_genes: Vec<u8>,

    /// 最佳適應度
    pub best_fitness: f64,

    /// 完成的世代數
    pub generations_completed: usize,

    /// 評估統計
    pub stats: SearchStats,

    /// 每代結束時的歷史最佳適應度
    pub fitness_history: Vec<f64>,
}

impl SearchResult {
    /// 最佳基因經結構修復後的決策矩陣
    pub fn repaired_grid(&self) -> oil_core::Result<DecisionGrid> {
        let mut grid = DecisionGrid::from_genes(&self.best_genes)?;
        repair_co_activation(&mut grid);
        Ok(grid)
    }
}
