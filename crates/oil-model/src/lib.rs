//! # Oil Planning Model
//!
//! 線性規劃模型：變數、約束、目標宣告與求解

pub mod balance;
pub mod model;
pub mod solver;

use oil_core::{DecisionGrid, O_NUM};
use serde::{Deserialize, Serialize};

// Re-export 主要類型
pub use balance::{StorageLedger, StorageRecord};
pub use model::PlanningModel;
pub use solver::{Direction, LpSolver, MicroLpSolver, SolveRequest, SolverFailure};

/// 模型求解模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelMode {
    /// 精確模式：使用決策為自由二元變數，與連續變數聯合求解
    Exact,
    /// 固定決策模式：使用決策由外部提供，僅求解連續變數
    FixedDecisions,
}

/// 規劃模型的最優解
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSolution {
    /// 求解模式
    pub mode: ModelMode,

    /// x[m][o] 採購量
    pub purchased: Vec<[f64; O_NUM]>,

    /// y[m][o] 使用量
    pub used: Vec<[f64; O_NUM]>,

    /// s[m][o] 月底庫存量
    pub stored: Vec<[f64; O_NUM]>,

    /// 生效的使用決策（精確模式為求解值，固定模式為外部輸入）
    pub decisions: DecisionGrid,

    /// P_total
    pub revenue: f64,

    /// C_total
    pub purchase_cost: f64,

    /// W_total
    pub storage_cost: f64,

    /// 利潤 P_total − C_total − W_total
    pub objective: f64,
}

impl PlanSolution {
    /// 月數
    pub fn months(&self) -> usize {
        self.used.len()
    }

    /// 某月的總產量（所有產品使用量之和）
    pub fn production(&self, month: usize) -> f64 {
        self.used.get(month).map(|row| row.iter().sum()).unwrap_or(0.0)
    }

    /// 某月混合油的平均硬度；該月無產量時為 None
    pub fn blend_hardness(&self, month: usize, hardness: &[f64; O_NUM]) -> Option<f64> {
        let row = self.used.get(month)?;
        let total: f64 = row.iter().sum();
        if total <= f64::EPSILON {
            return None;
        }
        let weighted: f64 = row.iter().zip(hardness).map(|(y, h)| y * h).sum();
        Some(weighted / total)
    }
}
