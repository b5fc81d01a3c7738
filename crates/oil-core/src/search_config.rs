//! 啟發式搜尋配置模型

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{OilError, Result, ScenarioData};

/// 搜尋參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 最大世代數
    pub num_generations: usize,

    /// 每代選出的親代數（同時為保留至下一代的菁英數）
    pub num_parents_mating: usize,

    /// 族群大小
    pub sol_per_pop: usize,

    /// 基因數（必須等於 M × 產品數）
    pub num_genes: usize,

    /// 每個子代翻轉的基因數
    pub mutation_num_genes: usize,

    /// 提前停止條件，例如 `"reach_100000"`、`"saturate_10"`
    #[serde(default, deserialize_with = "deserialize_stop_criteria")]
    pub stop_criteria: Vec<StopCriterion>,

    /// 每超出一個產品的懲罰權重
    pub punishment: f64,

    /// 隨機種子（None 表示由系統熵初始化）
    #[serde(default)]
    pub seed: Option<u64>,

    /// 是否以 rayon 平行評估同一世代的候選解
    #[serde(default)]
    pub parallel: bool,
}

impl SearchConfig {
    /// 創建新的搜尋配置
    pub fn new(num_genes: usize) -> Self {
        Self {
            num_generations: 50,
            num_parents_mating: 4,
            sol_per_pop: 10,
            num_genes,
            mutation_num_genes: 1,
            stop_criteria: Vec::new(),
            punishment: 1_000_000.0,
            seed: None,
            parallel: false,
        }
    }

    /// 以情境的基因數創建配置
    pub fn for_scenario(scenario: &ScenarioData) -> Self {
        Self::new(scenario.num_genes())
    }

    /// 建構器模式：設置世代數
    pub fn with_generations(mut self, num_generations: usize) -> Self {
        self.num_generations = num_generations;
        self
    }

    /// 建構器模式：設置族群大小與親代數
    pub fn with_population(mut self, sol_per_pop: usize, num_parents_mating: usize) -> Self {
        self.sol_per_pop = sol_per_pop;
        self.num_parents_mating = num_parents_mating;
        self
    }

    /// 建構器模式：設置突變基因數
    pub fn with_mutation_num_genes(mut self, mutation_num_genes: usize) -> Self {
        self.mutation_num_genes = mutation_num_genes;
        self
    }

    /// 建構器模式：設置懲罰權重
    pub fn with_punishment(mut self, punishment: f64) -> Self {
        self.punishment = punishment;
        self
    }

    /// 建構器模式：添加停止條件
    pub fn with_stop_criterion(mut self, criterion: StopCriterion) -> Self {
        self.stop_criteria.push(criterion);
        self
    }

    /// 建構器模式：設置隨機種子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 建構器模式：設置是否平行評估
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 從 JSON 字串載入並驗證
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OilError::Configuration(format!("搜尋配置格式錯誤: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 從 JSON 檔案載入並驗證
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 子代數量（族群大小扣除保留的菁英）
    pub fn num_offspring(&self) -> usize {
        self.sol_per_pop.saturating_sub(self.num_parents_mating)
    }

    /// 驗證配置本身
    pub fn validate(&self) -> Result<()> {
        if self.num_generations == 0 {
            return Err(OilError::Configuration("num_generations 必須至少為 1".to_string()));
        }

        if self.sol_per_pop < 2 {
            return Err(OilError::Configuration("sol_per_pop 必須至少為 2".to_string()));
        }

        if self.num_parents_mating == 0 || self.num_parents_mating > self.sol_per_pop {
            return Err(OilError::Configuration(format!(
                "num_parents_mating 必須介於 1 與 sol_per_pop ({}) 之間，實際為 {}",
                self.sol_per_pop, self.num_parents_mating
            )));
        }

        if self.num_genes == 0 {
            return Err(OilError::Configuration("num_genes 必須至少為 1".to_string()));
        }

        if self.mutation_num_genes > self.num_genes {
            return Err(OilError::Configuration(format!(
                "mutation_num_genes ({}) 不可大於 num_genes ({})",
                self.mutation_num_genes, self.num_genes
            )));
        }

        if !self.punishment.is_finite() || self.punishment <= 0.0 {
            return Err(OilError::Configuration(format!(
                "punishment 必須為正的有限數值，實際為 {}",
                self.punishment
            )));
        }

        Ok(())
    }

    /// 驗證配置與情境是否一致
    pub fn validate_for(&self, scenario: &ScenarioData) -> Result<()> {
        self.validate()?;

        if self.num_genes != scenario.num_genes() {
            return Err(OilError::Configuration(format!(
                "num_genes ({}) 必須等於 M × 產品數 ({})",
                self.num_genes,
                scenario.num_genes()
            )));
        }

        Ok(())
    }
}

/// 提前停止條件
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StopCriterion {
    /// 最佳適應度達到（或超過）目標值時停止
    Reach(f64),

    /// 最佳適應度連續 N 代未改善時停止
    Saturate(usize),
}

impl FromStr for StopCriterion {
    type Err = OilError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || OilError::Configuration(format!("無效的停止條件: {}", s));

        let (kind, value) = s.trim().split_once('_').ok_or_else(invalid)?;
        match kind {
            "reach" => value
                .parse::<f64>()
                .ok()
                .filter(|v| !v.is_nan())
                .map(StopCriterion::Reach)
                .ok_or_else(invalid),
            "saturate" => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(StopCriterion::Saturate)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for StopCriterion {
    type Error = OilError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StopCriterion> for String {
    fn from(criterion: StopCriterion) -> Self {
        criterion.to_string()
    }
}

impl fmt::Display for StopCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCriterion::Reach(target) => write!(f, "reach_{}", target),
            StopCriterion::Saturate(generations) => write!(f, "saturate_{}", generations),
        }
    }
}

/// 停止條件可寫成單一字串或字串陣列
fn deserialize_stop_criteria<'de, D>(deserializer: D) -> std::result::Result<Vec<StopCriterion>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(StopCriterion),
        Many(Vec<StopCriterion>),
        Nothing(()),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::One(criterion) => vec![criterion],
        Repr::Many(criteria) => criteria,
        Repr::Nothing(()) => Vec::new(),
    })
}
