//! # Oil Plan
//!
//! 食用油採購/使用/庫存規劃：可選的啟發式預搜尋，加上最終的精確求解

use oil_core::{DecisionGrid, OilError, ScenarioData, SearchConfig};
use oil_model::{ModelMode, PlanSolution, PlanningModel};
use oil_search::{HeuristicSearch, SearchResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub use oil_core;
pub use oil_model;
pub use oil_search;

/// 最終報告求解的模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinalSolveMode {
    /// 從頭以精確模式求解，搜尋結果僅用於引導，不強制套用
    #[default]
    Exact,
    /// 將修復後的最佳決策矩陣套用於最終求解
    FixedDecisions,
}

/// 一次規劃執行的報告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    /// 執行ID
    pub run_id: Uuid,

    /// 搜尋結果（未執行搜尋時為 None）
    pub search: Option<SearchResult>,

    /// 修復後的最佳決策矩陣
    pub searched_decisions: Option<DecisionGrid>,

    /// 最終求解實際使用的模式
    pub final_mode: ModelMode,

    /// 最終解（無解時為 None）
    pub solution: Option<PlanSolution>,
}

impl PlanReport {
    /// 最終目標值
    pub fn objective_value(&self) -> oil_core::Result<f64> {
        self.solution
            .as_ref()
            .map(|s| s.objective)
            .ok_or(OilError::NoSolution)
    }

    /// 序列化為 JSON
    pub fn to_json(&self) -> oil_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 規劃執行：可選搜尋 → 修復最佳解 → 最終求解
pub struct PlanningRun<'a> {
    scenario: &'a ScenarioData,
    search_config: Option<SearchConfig>,
    final_mode: FinalSolveMode,
}

impl<'a> PlanningRun<'a> {
    /// 創建不含搜尋的規劃執行
    pub fn new(scenario: &'a ScenarioData) -> Self {
        Self {
            scenario,
            search_config: None,
            final_mode: FinalSolveMode::default(),
        }
    }

    /// 建構器模式：啟用啟發式預搜尋
    pub fn with_search(mut self, config: SearchConfig) -> Self {
        self.search_config = Some(config);
        self
    }

    /// 建構器模式：設置最終求解模式
    pub fn with_final_mode(mut self, mode: FinalSolveMode) -> Self {
        self.final_mode = mode;
        self
    }

    /// 執行規劃
    ///
    /// 最終求解失敗不視為錯誤：報告中的解為 None，讀取目標值得到 `NoSolution`。
    pub fn run(&self) -> oil_core::Result<PlanReport> {
        self.scenario.validate()?;
        let run_id = Uuid::new_v4();
        tracing::info!("開始規劃 {}：{} 個月", run_id, self.scenario.months);

        let (search, searched_decisions) = match &self.search_config {
            Some(config) => {
                let result = HeuristicSearch::for_scenario(self.scenario, config.clone())?.run()?;
                let grid = result.repaired_grid()?;
                tracing::info!("搜尋最佳決策: {}", grid);
                tracing::info!("搜尋統計: {}", result.stats);
                (Some(result), Some(grid))
            }
            None => (None, None),
        };

        let mut model = PlanningModel::new(self.scenario);
        match (&searched_decisions, self.final_mode) {
            (Some(grid), FinalSolveMode::FixedDecisions) => {
                model = model.with_decisions(grid.clone())?;
            }
            (Some(_), FinalSolveMode::Exact) => {
                tracing::warn!("最終求解採精確模式，搜尋得到的決策矩陣不會套用於最終解");
            }
            (None, _) => {}
        }
        let final_mode = model.mode();

        model.setup()?;
        model.declare_objective()?;
        if !model.solve(true) {
            tracing::warn!("規劃 {} 找不到可行解", run_id);
        }

        let solution = model.into_solution().ok();
        if let Some(solution) = &solution {
            tracing::info!("規劃 {} 完成，利潤 {:.4}", run_id, solution.objective);
        }

        Ok(PlanReport {
            run_id,
            search,
            searched_decisions,
            final_mode,
            solution,
        })
    }
}

/// 從 JSON 檔案載入情境與搜尋配置，並檢查兩者一致
pub fn load_inputs(
    scenario_path: impl AsRef<Path>,
    search_path: impl AsRef<Path>,
) -> oil_core::Result<(ScenarioData, SearchConfig)> {
    let scenario = ScenarioData::from_json_file(scenario_path)?;
    let config = SearchConfig::from_json_file(search_path)?;
    config.validate_for(&scenario)?;
    Ok((scenario, config))
}
