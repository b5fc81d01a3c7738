//! 候選解評估（適應度函數）

use oil_core::{DecisionGrid, ScenarioData};
use oil_model::{LpSolver, MicroLpSolver, PlanningModel};

use crate::repair::{penalty, repair_co_activation};

/// 單一候選解的評估去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// 違反每月產品數上限，直接回傳負懲罰，未呼叫求解器
    Penalized,
    /// 交給求解器並取得最優利潤
    Solved,
    /// 交給求解器但無解，適應度記為 0
    Infeasible,
    /// 基因長度與規劃月數不符，無法解碼，適應度記為 0
    Undecodable,
}

/// 評估結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub fitness: f64,
    pub outcome: EvaluationOutcome,
}

impl Evaluation {
    /// 違反產品數上限：適應度為負懲罰
    pub fn penalized(penalty: f64) -> Self {
        Self {
            fitness: -penalty,
            outcome: EvaluationOutcome::Penalized,
        }
    }

    /// 求解成功：適應度為最優利潤
    pub fn solved(objective: f64) -> Self {
        Self {
            fitness: objective,
            outcome: EvaluationOutcome::Solved,
        }
    }

    /// 求解器無解
    pub fn infeasible() -> Self {
        Self {
            fitness: 0.0,
            outcome: EvaluationOutcome::Infeasible,
        }
    }

    /// 基因無法解碼
    pub fn undecodable() -> Self {
        Self {
            fitness: 0.0,
            outcome: EvaluationOutcome::Undecodable,
        }
    }

    /// 是否呼叫了求解器
    pub fn delegated(&self) -> bool {
        matches!(
            self.outcome,
            EvaluationOutcome::Solved | EvaluationOutcome::Infeasible
        )
    }
}

/// 候選解評估能力
pub trait CandidateEvaluator: Sync {
    fn evaluate(&self, genes: &[u8]) -> Evaluation;
}

/// 以固定決策模式的規劃模型評估候選解
pub struct FixedDecisionEvaluator<'a, S = MicroLpSolver> {
    scenario: &'a ScenarioData,
    punishment: f64,
    solver: S,
}

impl<'a> FixedDecisionEvaluator<'a, MicroLpSolver> {
    /// 使用預設 microlp 求解器
    pub fn new(scenario: &'a ScenarioData, punishment: f64) -> Self {
        Self::with_solver(scenario, punishment, MicroLpSolver)
    }
}

impl<'a, S: LpSolver> FixedDecisionEvaluator<'a, S> {
    /// 使用指定求解器
    pub fn with_solver(scenario: &'a ScenarioData, punishment: f64, solver: S) -> Self {
        Self {
            scenario,
            punishment,
            solver,
        }
    }

    /// 評估所用的情境
    pub fn scenario(&self) -> &ScenarioData {
        self.scenario
    }

    /// 解碼並修復：扁平基因 → M × O 矩陣，再套用共同啟用規則
    pub fn decode(&self, genes: &[u8]) -> oil_core::Result<DecisionGrid> {
        let mut grid = DecisionGrid::from_genes(genes)?;
        grid.ensure_months(self.scenario.months)?;
        repair_co_activation(&mut grid);
        Ok(grid)
    }

    /// 以固定決策求解，回傳最優利潤
    fn solve_fixed(&self, grid: DecisionGrid) -> oil_core::Result<f64> {
        let mut model = PlanningModel::new(self.scenario).with_decisions(grid)?;
        model.setup()?;
        model.declare_objective()?;
        model.solve_with(&self.solver, false);
        model.objective_value()
    }
}

impl<'a, S: LpSolver> CandidateEvaluator for FixedDecisionEvaluator<'a, S> {
    fn evaluate(&self, genes: &[u8]) -> Evaluation {
        let grid = match self.decode(genes) {
            Ok(grid) => grid,
            Err(err) => {
                tracing::debug!("候選解無法解碼: {}", err);
                return Evaluation::undecodable();
            }
        };

        let penalty = penalty(&grid, self.scenario.max_active_products, self.punishment);
        if penalty != 0.0 {
            return Evaluation::penalized(penalty);
        }

        match self.solve_fixed(grid) {
            Ok(objective) => Evaluation::solved(objective),
            Err(err) => {
                tracing::debug!("候選解不可行: {}", err);
                Evaluation::infeasible()
            }
        }
    }
}
