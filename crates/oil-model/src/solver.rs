//! 外部線性規劃求解服務介面

use good_lp::solvers::microlp::microlp;
use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};

/// 目標方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximise,
    Minimise,
}

/// 求解請求：模型建構器宣告完成後交給求解服務的完整問題
pub struct SolveRequest {
    /// 已宣告的變數
    pub variables: ProblemVariables,

    /// 目標函數
    pub objective: Expression,

    /// 目標方向
    pub direction: Direction,

    /// 約束集合
    pub constraints: Vec<Constraint>,

    /// 需要回傳數值的變數（回傳順序與此相同）
    pub watched: Vec<Variable>,
}

/// 求解失敗原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolverFailure {
    #[error("問題不可行")]
    Infeasible,

    #[error("問題無界")]
    Unbounded,

    #[error("求解器錯誤: {0}")]
    Other(String),
}

impl From<ResolutionError> for SolverFailure {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolverFailure::Infeasible,
            ResolutionError::Unbounded => SolverFailure::Unbounded,
            other => SolverFailure::Other(other.to_string()),
        }
    }
}

/// 線性/混合整數規劃求解服務
///
/// 成功時依 `watched` 的順序回傳各變數的最優值。
pub trait LpSolver: Send + Sync {
    fn solve(&self, request: SolveRequest) -> Result<Vec<f64>, SolverFailure>;
}

/// 以 good_lp 的純 Rust microlp 後端求解（整數變數以分支定界處理）
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl LpSolver for MicroLpSolver {
    fn solve(&self, request: SolveRequest) -> Result<Vec<f64>, SolverFailure> {
        let SolveRequest {
            variables,
            objective,
            direction,
            constraints,
            watched,
        } = request;

        let unsolved = match direction {
            Direction::Maximise => variables.maximise(objective),
            Direction::Minimise => variables.minimise(objective),
        };

        let solution = unsolved
            .using(microlp)
            .with_all(constraints)
            .solve()?;

        Ok(watched.iter().map(|&v| solution.value(v)).collect())
    }
}
