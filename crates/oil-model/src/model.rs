//! 採購/使用/庫存規劃模型

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use oil_core::{
    month_label, product_label, DecisionGrid, OilError, ScenarioData, CO_ACTIVATION,
    NON_VEGETABLE, O_NUM, VEGETABLE,
};

use crate::solver::{Direction, LpSolver, MicroLpSolver, SolveRequest};
use crate::{ModelMode, PlanSolution};

/// 已宣告的模型變數
struct ModelVariables {
    /// x[m][o] 採購量
    purchased: Vec<[Variable; O_NUM]>,
    /// y[m][o] 使用量
    used: Vec<[Variable; O_NUM]>,
    /// s[m][o] 月底庫存量
    stored: Vec<[Variable; O_NUM]>,
    /// d[m][o] 使用決策（僅精確模式宣告為變數）
    decisions: Option<Vec<[Variable; O_NUM]>>,
    /// P_total 銷售收入
    revenue: Variable,
    /// C_total 採購成本
    purchase_cost: Variable,
    /// W_total 庫存成本
    storage_cost: Variable,
    /// 變數名稱（記錄解時使用）
    names: Vec<(Variable, String)>,
}

/// 單次規劃問題的模型建構器
///
/// 精確模式下使用決策 d 為自由二元變數；固定決策模式下 d 由外部提供，
/// 直接寫入約束成為常數，問題退化為純線性規劃。
pub struct PlanningModel<'a> {
    scenario: &'a ScenarioData,
    fixed_decisions: Option<DecisionGrid>,
    problem: ProblemVariables,
    vars: Option<ModelVariables>,
    constraints: Vec<Constraint>,
    constraints_declared: bool,
    objective: Option<Expression>,
    solution: Option<PlanSolution>,
}

impl<'a> PlanningModel<'a> {
    /// 創建精確模式模型
    pub fn new(scenario: &'a ScenarioData) -> Self {
        Self {
            scenario,
            fixed_decisions: None,
            problem: ProblemVariables::new(),
            vars: None,
            constraints: Vec::new(),
            constraints_declared: false,
            objective: None,
            solution: None,
        }
    }

    /// 設置外部決策矩陣，切換為固定決策模式
    pub fn with_decisions(mut self, decisions: DecisionGrid) -> oil_core::Result<Self> {
        decisions.ensure_months(self.scenario.months)?;
        self.fixed_decisions = Some(decisions);
        Ok(self)
    }

    /// 目前的求解模式
    pub fn mode(&self) -> ModelMode {
        if self.fixed_decisions.is_some() {
            ModelMode::FixedDecisions
        } else {
            ModelMode::Exact
        }
    }

    /// 已宣告的約束數
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// 已宣告的變數數
    pub fn variable_count(&self) -> usize {
        self.vars.as_ref().map(|v| v.names.len()).unwrap_or(0)
    }

    /// 宣告變數與約束
    pub fn setup(&mut self) -> oil_core::Result<()> {
        self.declare_variables()?;
        self.declare_constraints()
    }

    /// 宣告決策變數（每個模型只能宣告一次）
    pub fn declare_variables(&mut self) -> oil_core::Result<()> {
        if self.vars.is_some() {
            return Err(OilError::ModelAlreadyDeclared("變數已宣告"));
        }

        let months = self.scenario.months;
        let so_max = self.scenario.storage_capacity;
        let problem = &mut self.problem;
        let mut names = Vec::new();

        let mut matrix = |prefix: &str, upper: Option<f64>, binary: bool| {
            (0..months)
                .map(|m| {
                    std::array::from_fn(|o| {
                        let name = format!("{}_{}_{}", prefix, month_label(m), product_label(o));
                        let definition = if binary {
                            variable().binary()
                        } else {
                            match upper {
                                Some(ub) => variable().min(0.0).max(ub),
                                None => variable().min(0.0),
                            }
                        };
                        let var = problem.add(definition.name(name.clone()));
                        names.push((var, name));
                        var
                    })
                })
                .collect::<Vec<[Variable; O_NUM]>>()
        };

        let purchased = matrix("x", None, false);
        let used = matrix("y", None, false);
        let stored = matrix("s", Some(so_max), false);
        let decisions = if self.fixed_decisions.is_none() {
            Some(matrix("d", None, true))
        } else {
            None
        };

        let mut scalar = |name: &str| {
            let var = problem.add(variable().min(0.0).name(name));
            names.push((var, name.to_string()));
            var
        };
        let revenue = scalar("P_total");
        let purchase_cost = scalar("C_total");
        let storage_cost = scalar("W_total");

        self.vars = Some(ModelVariables {
            purchased,
            used,
            stored,
            decisions,
            revenue,
            purchase_cost,
            storage_cost,
            names,
        });
        Ok(())
    }

    /// 宣告全部約束（每個模型只能宣告一次）
    pub fn declare_constraints(&mut self) -> oil_core::Result<()> {
        if self.constraints_declared {
            return Err(OilError::ModelAlreadyDeclared("約束已宣告"));
        }
        let vars = self
            .vars
            .as_ref()
            .ok_or(OilError::ModelNotDeclared("必須先宣告變數才能宣告約束"))?;

        let mut constraints = Vec::new();
        constraints.extend(self.total_sums(vars));
        constraints.extend(self.max_amount_produced(vars));
        constraints.extend(self.start_amount(vars));
        constraints.extend(self.stored_amount_balance(vars));
        constraints.extend(self.final_stored_amount(vars));
        constraints.extend(self.hardness_bounds(vars));
        constraints.extend(self.binary_linkage(vars));

        self.constraints.extend(constraints);
        self.constraints_declared = true;
        Ok(())
    }

    /// 宣告目標：最大化 P_total − C_total − W_total
    pub fn declare_objective(&mut self) -> oil_core::Result<()> {
        let vars = self
            .vars
            .as_ref()
            .ok_or(OilError::ModelNotDeclared("必須先宣告變數才能宣告目標"))?;

        self.objective = Some(vars.revenue - vars.purchase_cost - vars.storage_cost);
        Ok(())
    }

    /// 總收入、總庫存成本、總採購成本
    fn total_sums(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let data = self.scenario;

        let mut used_sum: Expression = 0.into();
        let mut stored_sum: Expression = 0.into();
        let mut cost_sum: Expression = 0.into();
        for m in 0..data.months {
            for o in 0..O_NUM {
                used_sum += vars.used[m][o];
                stored_sum += vars.stored[m][o];
                cost_sum += vars.purchased[m][o] * data.purchase_cost[m][o];
            }
        }

        vec![
            constraint!(vars.revenue == used_sum * data.sale_price),
            constraint!(vars.storage_cost == stored_sum * data.storage_cost),
            constraint!(vars.purchase_cost == cost_sum),
        ]
    }

    /// 每月植物油/非植物油最大精煉量
    fn max_amount_produced(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let data = self.scenario;
        let mut constraints = Vec::with_capacity(2 * data.months);

        for row in &vars.used {
            let vegetable = group_sum(row, &VEGETABLE);
            let non_vegetable = group_sum(row, &NON_VEGETABLE);
            constraints.push(constraint!(vegetable <= data.vegetable_capacity));
            constraints.push(constraint!(non_vegetable <= data.non_vegetable_capacity));
        }

        constraints
    }

    /// 第一個月：s = So_start − y + x
    fn start_amount(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let start = self.scenario.storage_start;

        (0..O_NUM)
            .map(|o| {
                constraint!(vars.stored[0][o] + vars.used[0][o] - vars.purchased[0][o] == start)
            })
            .collect()
    }

    /// 後續月份：s[m] = s[m−1] − y[m] + x[m]
    fn stored_amount_balance(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let mut constraints = Vec::new();

        for m in 1..self.scenario.months {
            for o in 0..O_NUM {
                constraints.push(constraint!(
                    vars.stored[m][o] - vars.stored[m - 1][o] + vars.used[m][o]
                        - vars.purchased[m][o]
                        == 0.0
                ));
            }
        }

        constraints
    }

    /// 最後一個月的庫存必須等於 So_stop
    fn final_stored_amount(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let last = self.scenario.last_month();
        let stop = self.scenario.storage_stop;

        (0..O_NUM)
            .map(|o| constraint!(vars.stored[last][o] == stop))
            .collect()
    }

    /// 每月混合油硬度介於 H_min 與 H_max
    fn hardness_bounds(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let data = self.scenario;
        let mut constraints = Vec::with_capacity(2 * data.months);

        for row in &vars.used {
            let mut above_min: Expression = 0.into();
            let mut below_max: Expression = 0.into();
            for o in 0..O_NUM {
                above_min += row[o] * (data.hardness[o] - data.hardness_min);
                below_max += row[o] * (data.hardness_max - data.hardness[o]);
            }
            constraints.push(constraint!(above_min >= 0.0));
            constraints.push(constraint!(below_max >= 0.0));
        }

        constraints
    }

    /// 使用決策與使用量的連結
    fn binary_linkage(&self, vars: &ModelVariables) -> Vec<Constraint> {
        let data = self.scenario;
        let mut constraints = Vec::new();

        match (&self.fixed_decisions, &vars.decisions) {
            (Some(grid), _) => {
                for (m, row) in vars.used.iter().enumerate() {
                    for (o, &y) in row.iter().enumerate() {
                        if grid.is_active(m, o) {
                            constraints.push(constraint!(y >= data.min_usage));
                        } else {
                            constraints.push(constraint!(y == 0.0));
                        }
                    }
                }
            }
            (None, Some(decisions)) => {
                for (used, d) in vars.used.iter().zip(decisions) {
                    for o in 0..O_NUM {
                        constraints.push(constraint!(used[o] <= d[o] * data.big_m));
                        constraints.push(constraint!(used[o] >= d[o] * data.min_usage));
                    }

                    let active = group_sum(d, &[0, 1, 2, 3, 4]);
                    constraints.push(constraint!(active <= data.max_active_products as f64));

                    let vegetable = group_sum(d, &VEGETABLE);
                    constraints.push(constraint!(vegetable <= d[CO_ACTIVATION] * 2.0));
                }
            }
            (None, None) => {}
        }

        constraints
    }

    /// 以預設 microlp 後端求解
    pub fn solve(&mut self, logging: bool) -> bool {
        self.solve_with(&MicroLpSolver, logging)
    }

    /// 交由指定求解服務求解
    ///
    /// 失敗時僅記錄，不向外傳遞；之後讀取目標值會得到 `NoSolution`。
    pub fn solve_with<S: LpSolver + ?Sized>(&mut self, solver: &S, logging: bool) -> bool {
        let (Some(vars), Some(objective)) = (self.vars.as_ref(), self.objective.take()) else {
            tracing::warn!("模型尚未完成宣告（變數或目標），無法求解");
            return false;
        };

        let mode = self.mode();
        if logging {
            tracing::info!(
                "模型資訊: 模式 {:?}，月數 {}，變數 {} 個，約束 {} 條",
                mode,
                self.scenario.months,
                vars.names.len(),
                self.constraints.len()
            );
        }

        let watched: Vec<Variable> = vars.names.iter().map(|(v, _)| *v).collect();
        let request = SolveRequest {
            variables: std::mem::replace(&mut self.problem, ProblemVariables::new()),
            objective,
            direction: Direction::Maximise,
            constraints: std::mem::take(&mut self.constraints),
            watched,
        };

        let values = match solver.solve(request) {
            Ok(values) => values,
            Err(failure) => {
                if logging {
                    tracing::warn!("找不到解: {}", failure);
                } else {
                    tracing::debug!("找不到解: {}", failure);
                }
                return false;
            }
        };

        if logging {
            for ((_, name), value) in vars.names.iter().zip(&values) {
                if value.abs() > 1e-9 {
                    tracing::info!("  {} = {:.4}", name, value);
                }
            }
        }

        let solution = self.read_solution(vars, &values);
        if logging {
            tracing::info!("目標值: {:.4}", solution.objective);
        }
        self.solution = Some(solution);
        true
    }

    /// 依變數宣告順序將求解值還原為解
    fn read_solution(&self, vars: &ModelVariables, values: &[f64]) -> PlanSolution {
        let months = self.scenario.months;
        let mut cursor = values.iter().copied();
        let mut matrix = || -> Vec<[f64; O_NUM]> {
            (0..months)
                .map(|_| std::array::from_fn(|_| cursor.next().unwrap_or(0.0)))
                .collect()
        };

        let purchased = matrix();
        let used = matrix();
        let stored = matrix();
        let solved_decisions = vars.decisions.as_ref().map(|_| matrix());

        let revenue = cursor.next().unwrap_or(0.0);
        let purchase_cost = cursor.next().unwrap_or(0.0);
        let storage_cost = cursor.next().unwrap_or(0.0);

        let decisions = match (&self.fixed_decisions, solved_decisions) {
            (Some(grid), _) => grid.clone(),
            (None, Some(d)) => DecisionGrid::new(
                d.iter()
                    .map(|row| std::array::from_fn(|o| row[o] > 0.5))
                    .collect(),
            ),
            (None, None) => DecisionGrid::all_inactive(months),
        };

        PlanSolution {
            mode: self.mode(),
            purchased,
            used,
            stored,
            decisions,
            revenue,
            purchase_cost,
            storage_cost,
            objective: revenue - purchase_cost - storage_cost,
        }
    }

    /// 最優目標值
    pub fn objective_value(&self) -> oil_core::Result<f64> {
        self.solution
            .as_ref()
            .map(|s| s.objective)
            .ok_or(OilError::NoSolution)
    }

    /// 完整解
    pub fn solution(&self) -> oil_core::Result<&PlanSolution> {
        self.solution.as_ref().ok_or(OilError::NoSolution)
    }

    /// 取出完整解
    pub fn into_solution(self) -> oil_core::Result<PlanSolution> {
        self.solution.ok_or(OilError::NoSolution)
    }
}

fn group_sum(row: &[Variable; O_NUM], products: &[usize]) -> Expression {
    let mut sum: Expression = 0.into();
    for &o in products {
        sum += row[o];
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverFailure;
    use rstest::rstest;

    /// 成本 1、產能 100、期初期末庫存 0 的簡單情境
    fn trivial_scenario(months: usize) -> ScenarioData {
        ScenarioData::new(vec![[1.0; O_NUM]; months])
            .with_max_active_products(5)
            .with_storage(100.0, 0.0, 0.0)
            .with_capacities(100.0, 100.0)
            .with_hardness([5.0; O_NUM], 3.0, 6.0)
            .with_min_usage(1.0)
            .with_big_m(1000.0)
            .with_prices(10.0, 1.0)
    }

    fn solved(model: &mut PlanningModel<'_>) -> bool {
        model.setup().unwrap();
        model.declare_objective().unwrap();
        model.solve(false)
    }

    struct FailingSolver;

    impl LpSolver for FailingSolver {
        fn solve(&self, _request: SolveRequest) -> Result<Vec<f64>, SolverFailure> {
            Err(SolverFailure::Other("unavailable".to_string()))
        }
    }

    #[rstest]
    #[case(1)]
    #[case(6)]
    #[case(12)]
    fn test_exact_mode_declarations(#[case] months: usize) {
        let scenario = trivial_scenario(months);
        let mut model = PlanningModel::new(&scenario);
        model.setup().unwrap();

        assert_eq!(model.mode(), ModelMode::Exact);
        // x, y, s, d 各 5M 個 + 3 個總和
        assert_eq!(model.variable_count(), 20 * months + 3);
        // 總和 3 + 產能 2M + 期初 5 + 後續 5(M−1) + 期末 5 + 硬度 2M + 連結 12M
        assert_eq!(model.constraint_count(), 8 + 21 * months);
    }

    #[rstest]
    #[case(1)]
    #[case(6)]
    fn test_fixed_mode_declarations(#[case] months: usize) {
        let scenario = trivial_scenario(months);
        let mut model = PlanningModel::new(&scenario)
            .with_decisions(DecisionGrid::all_active(months))
            .unwrap();
        model.setup().unwrap();

        assert_eq!(model.mode(), ModelMode::FixedDecisions);
        assert_eq!(model.variable_count(), 15 * months + 3);
        assert_eq!(model.constraint_count(), 8 + 14 * months);
    }

    #[test]
    fn test_decision_grid_must_match_months() {
        let scenario = trivial_scenario(6);
        let result = PlanningModel::new(&scenario).with_decisions(DecisionGrid::all_active(5));

        assert!(matches!(result, Err(OilError::InvalidDecisionGrid(_))));
    }

    #[test]
    fn test_constraints_require_variables() {
        let scenario = trivial_scenario(1);
        let mut model = PlanningModel::new(&scenario);

        assert!(matches!(
            model.declare_constraints(),
            Err(OilError::ModelNotDeclared(_))
        ));
        assert!(model.declare_objective().is_err());
    }

    #[test]
    fn test_repeated_declaration_is_rejected() {
        let scenario = trivial_scenario(2);
        let mut model = PlanningModel::new(&scenario);
        model.setup().unwrap();
        let variables = model.variable_count();
        let constraints = model.constraint_count();

        assert!(matches!(model.setup(), Err(OilError::ModelAlreadyDeclared(_))));
        assert!(matches!(
            model.declare_variables(),
            Err(OilError::ModelAlreadyDeclared(_))
        ));
        assert!(matches!(
            model.declare_constraints(),
            Err(OilError::ModelAlreadyDeclared(_))
        ));
        assert_eq!(model.variable_count(), variables);
        assert_eq!(model.constraint_count(), constraints);
    }

    #[test]
    fn test_objective_before_solve_is_no_solution() {
        let scenario = trivial_scenario(2);
        let mut model = PlanningModel::new(&scenario);
        model.setup().unwrap();

        assert_eq!(model.objective_value(), Err(OilError::NoSolution));
        assert!(model.solution().is_err());
    }

    #[test]
    fn test_solve_without_objective_fails() {
        let scenario = trivial_scenario(1);
        let mut model = PlanningModel::new(&scenario);
        model.setup().unwrap();

        assert!(!model.solve(false));
        assert_eq!(model.objective_value(), Err(OilError::NoSolution));
    }

    #[test]
    fn test_fixed_all_active_trivial_optimum() {
        // 每月兩組產能各 100，單位利潤 10 − 1 = 9，不囤貨：6 × 200 × 9
        let scenario = trivial_scenario(6);
        let mut model = PlanningModel::new(&scenario)
            .with_decisions(DecisionGrid::all_active(6))
            .unwrap();

        assert!(solved(&mut model));
        let objective = model.objective_value().unwrap();
        assert!((objective - 10_800.0).abs() < 1e-6, "objective = {}", objective);

        let solution = model.solution().unwrap();
        for m in 0..6 {
            for o in 0..O_NUM {
                assert!(solution.used[m][o] >= 1.0 - 1e-6);
                assert!(solution.stored[m][o].abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_fixed_inactive_products_are_unused() {
        let scenario = trivial_scenario(2);
        let grid = DecisionGrid::new(vec![[false, false, true, false, false]; 2]);
        let mut model = PlanningModel::new(&scenario).with_decisions(grid).unwrap();

        assert!(solved(&mut model));
        let solution = model.solution().unwrap();
        assert!((model.objective_value().unwrap() - 1_800.0).abs() < 1e-6);
        for m in 0..2 {
            assert!((solution.used[m][2] - 100.0).abs() < 1e-6);
            for o in [0, 1, 3, 4] {
                assert!(solution.used[m][o].abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_fixed_mode_ignores_activation_limit() {
        // O_max = 1，但外部矩陣全部啟用：固定決策模式不再檢查產品數上限
        let scenario = trivial_scenario(2).with_max_active_products(1);
        let mut model = PlanningModel::new(&scenario)
            .with_decisions(DecisionGrid::all_active(2))
            .unwrap();

        assert!(solved(&mut model));
        let objective = model.objective_value().unwrap();
        assert!((objective - 3_600.0).abs() < 1e-6, "objective = {}", objective);
        let solution = model.solution().unwrap();
        assert_eq!(solution.decisions.active_count(0), O_NUM);
    }

    #[test]
    fn test_fixed_mode_ignores_co_activation() {
        // 只啟用 VEG1、未啟用 OIL3：矩陣照原樣套用
        let scenario = trivial_scenario(2);
        let grid = DecisionGrid::new(vec![[true, false, false, false, false]; 2]);
        let mut model = PlanningModel::new(&scenario).with_decisions(grid).unwrap();

        assert!(solved(&mut model));
        let objective = model.objective_value().unwrap();
        assert!((objective - 1_800.0).abs() < 1e-6, "objective = {}", objective);

        let solution = model.solution().unwrap();
        for m in 0..2 {
            assert!((solution.used[m][0] - 100.0).abs() < 1e-6);
            assert!(solution.used[m][4].abs() < 1e-9);
            assert!(!solution.decisions.is_active(m, 4));
        }
    }

    #[test]
    fn test_fixed_solve_is_idempotent() {
        let scenario = trivial_scenario(3);
        let grid = DecisionGrid::new(vec![
            [true, false, false, false, true],
            [false, true, true, false, true],
            [true, true, false, true, true],
        ]);

        let mut first = PlanningModel::new(&scenario).with_decisions(grid.clone()).unwrap();
        let mut second = PlanningModel::new(&scenario).with_decisions(grid).unwrap();
        assert!(solved(&mut first));
        assert!(solved(&mut second));

        assert_eq!(
            first.objective_value().unwrap(),
            second.objective_value().unwrap()
        );
    }

    #[test]
    fn test_exact_mode_respects_activation_rules() {
        // O_max = 1：植物油必須與第五種產品同時啟用，因此只能單獨使用一種非植物油
        let scenario = trivial_scenario(2).with_max_active_products(1);
        let mut model = PlanningModel::new(&scenario);

        assert!(solved(&mut model));
        let objective = model.objective_value().unwrap();
        assert!((objective - 1_800.0).abs() < 1e-6, "objective = {}", objective);

        let solution = model.solution().unwrap();
        for m in 0..2 {
            assert!(solution.decisions.active_count(m) <= 1);
            assert!(!solution.decisions.is_active(m, 0));
            assert!(!solution.decisions.is_active(m, 1));
        }
    }

    #[test]
    fn test_exact_mode_no_solution_when_nothing_may_be_used() {
        // O_max = 0 時無法使用任何產品，庫存只增不減，期末 0 無法達成
        let scenario = trivial_scenario(6)
            .with_max_active_products(0)
            .with_storage(100.0, 50.0, 0.0);
        let mut model = PlanningModel::new(&scenario);

        assert!(!solved(&mut model));
        assert_eq!(model.objective_value(), Err(OilError::NoSolution));
    }

    #[test]
    fn test_solver_failure_is_contained() {
        let scenario = trivial_scenario(1);
        let mut model = PlanningModel::new(&scenario)
            .with_decisions(DecisionGrid::all_active(1))
            .unwrap();
        model.setup().unwrap();
        model.declare_objective().unwrap();

        assert!(!model.solve_with(&FailingSolver, true));
        assert_eq!(model.objective_value(), Err(OilError::NoSolution));
    }
}
