//! 啟發式（遺傳）搜尋主迴圈

use oil_core::{OilError, ScenarioData, SearchConfig, StopCriterion};
use oil_model::MicroLpSolver;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::evaluator::{CandidateEvaluator, Evaluation, FixedDecisionEvaluator};
use crate::population::{
    best, flip_mutation, random_population, rank_selection, single_point_crossover, Individual,
};
use crate::{SearchResult, SearchStats};

/// 在二元使用決策空間中搜尋利潤最高的決策矩陣
pub struct HeuristicSearch<E> {
    config: SearchConfig,
    evaluator: E,
    rng: StdRng,
}

impl<'a> HeuristicSearch<FixedDecisionEvaluator<'a, MicroLpSolver>> {
    /// 以固定決策模式的規劃模型作為適應度函數
    pub fn for_scenario(scenario: &'a ScenarioData, config: SearchConfig) -> oil_core::Result<Self> {
        config.validate_for(scenario)?;
        let evaluator = FixedDecisionEvaluator::new(scenario, config.punishment);
        Self::new(config, evaluator)
    }
}

impl<E: CandidateEvaluator> HeuristicSearch<E> {
    /// 創建搜尋器
    pub fn new(config: SearchConfig, evaluator: E) -> oil_core::Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            evaluator,
            rng,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// 評估一批候選解，統計數據於評估完成後合併
    fn evaluate_all(&self, candidates: Vec<Vec<u8>>, stats: &mut SearchStats) -> Vec<Individual> {
        let evaluations: Vec<Evaluation> = if self.config.parallel {
            candidates
                .par_iter()
                .map(|genes| self.evaluator.evaluate(genes))
                .collect()
        } else {
            candidates
                .iter()
                .map(|genes| self.evaluator.evaluate(genes))
                .collect()
        };

        evaluations.iter().for_each(|e| stats.record(e));

        candidates
            .into_iter()
            .zip(evaluations)
            .map(|(genes, e)| Individual::new(genes, e.fitness))
            .collect()
    }

    /// 執行搜尋
    pub fn run(&mut self) -> oil_core::Result<SearchResult> {
        let config = self.config.clone();
        tracing::info!(
            "開始啟發式搜尋：族群 {}，基因 {}，最多 {} 代",
            config.sol_per_pop,
            config.num_genes,
            config.num_generations
        );

        let start_time = std::time::Instant::now();
        let mut stats = SearchStats::default();

        let initial = random_population(&mut self.rng, config.sol_per_pop, config.num_genes);
        let mut population = self.evaluate_all(initial, &mut stats);

        let mut champion = best(&population)
            .cloned()
            .ok_or_else(|| OilError::Configuration("族群不可為空".to_string()))?;
        let mut fitness_history = Vec::with_capacity(config.num_generations);
        let mut stale_generations = 0usize;
        let mut generations_completed = 0usize;

        for generation in 1..=config.num_generations {
            let parents = rank_selection(&mut self.rng, &population, config.num_parents_mating);

            let mut offspring =
                single_point_crossover(&mut self.rng, &parents, config.num_offspring());
            for child in offspring.iter_mut() {
                flip_mutation(&mut self.rng, child, config.mutation_num_genes);
            }

            // 菁英保留適應度，只評估新子代
            let mut next = parents;
            next.extend(self.evaluate_all(offspring, &mut stats));
            population = next;
            generations_completed = generation;

            let generation_best = best(&population)
                .cloned()
                .ok_or_else(|| OilError::Configuration("族群不可為空".to_string()))?;
            if generation_best.fitness > champion.fitness {
                champion = generation_best;
                stale_generations = 0;
            } else {
                stale_generations += 1;
            }
            fitness_history.push(champion.fitness);

            tracing::info!("第 {} 代最佳適應度: {}", generation, champion.fitness);

            if let Some(criterion) = self.reached_stop(champion.fitness, stale_generations) {
                tracing::info!("停止條件 {} 成立，於第 {} 代結束", criterion, generation);
                break;
            }
        }

        tracing::info!(
            "搜尋完成：{} 代，耗時 {:?}，{}",
            generations_completed,
            start_time.elapsed(),
            stats
        );

        Ok(SearchResult {
            best_genes: champion.genes,
            best_fitness: champion.fitness,
            generations_completed,
            stats,
            fitness_history,
        })
    }

    /// 第一個成立的停止條件
    fn reached_stop(&self, best_fitness: f64, stale_generations: usize) -> Option<StopCriterion> {
        self.config
            .stop_criteria
            .iter()
            .copied()
            .find(|criterion| match *criterion {
                StopCriterion::Reach(target) => best_fitness >= target,
                StopCriterion::Saturate(limit) => stale_generations >= limit,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationOutcome;

    /// 以啟用基因數作為利潤的評估器
    struct CountingEvaluator;

    impl CandidateEvaluator for CountingEvaluator {
        fn evaluate(&self, genes: &[u8]) -> Evaluation {
            Evaluation::solved(genes.iter().map(|&g| g as f64).sum())
        }
    }

    /// 一律懲罰的評估器
    struct RejectingEvaluator;

    impl CandidateEvaluator for RejectingEvaluator {
        fn evaluate(&self, _genes: &[u8]) -> Evaluation {
            Evaluation::penalized(1.0)
        }
    }

    fn config() -> SearchConfig {
        SearchConfig::new(10)
            .with_generations(30)
            .with_population(8, 4)
            .with_mutation_num_genes(1)
            .with_seed(11)
    }

    #[test]
    fn test_counts_every_evaluation() {
        let mut search = HeuristicSearch::new(config(), CountingEvaluator).unwrap();
        let result = search.run().unwrap();

        // 初始族群 8 個 + 每代 4 個子代
        let expected = 8 + 4 * result.generations_completed as u64;
        assert_eq!(result.stats.evaluated, expected);
        assert_eq!(result.stats.delegated, expected);
        assert_eq!(result.stats.penalized, 0);
        assert_eq!(result.fitness_history.len(), result.generations_completed);
    }

    #[test]
    fn test_best_fitness_never_decreases() {
        let mut search = HeuristicSearch::new(config(), CountingEvaluator).unwrap();
        let result = search.run().unwrap();

        assert!(result
            .fitness_history
            .windows(2)
            .all(|pair| pair[1] >= pair[0]));
        assert_eq!(
            result.best_fitness,
            result.best_genes.iter().map(|&g| g as f64).sum::<f64>()
        );
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let first = HeuristicSearch::new(config(), CountingEvaluator)
            .unwrap()
            .run()
            .unwrap();
        let second = HeuristicSearch::new(config().with_parallel(true), CountingEvaluator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(first.best_genes, second.best_genes);
        assert_eq!(first.fitness_history, second.fitness_history);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_reach_criterion_stops_early() {
        let config = config().with_stop_criterion(StopCriterion::Reach(0.0));
        let result = HeuristicSearch::new(config, CountingEvaluator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.generations_completed, 1);
    }

    #[test]
    fn test_saturate_criterion_stops_on_plateau() {
        let config = config().with_stop_criterion(StopCriterion::Saturate(3));
        let result = HeuristicSearch::new(config, RejectingEvaluator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.generations_completed, 3);
        assert_eq!(result.best_fitness, -1.0);
        assert_eq!(result.stats.penalized, result.stats.evaluated);
        assert_eq!(result.stats.delegated, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = config().with_population(4, 6);
        assert!(matches!(
            HeuristicSearch::new(config, CountingEvaluator),
            Err(OilError::Configuration(_))
        ));
    }

    #[test]
    fn test_for_scenario_checks_gene_count() {
        let scenario = ScenarioData::food_manufacture();
        assert!(HeuristicSearch::for_scenario(&scenario, SearchConfig::new(10)).is_err());
        assert!(HeuristicSearch::for_scenario(&scenario, SearchConfig::for_scenario(&scenario)).is_ok());
    }

    #[test]
    fn test_outcome_helpers() {
        assert_eq!(Evaluation::infeasible().outcome, EvaluationOutcome::Infeasible);
        assert!(Evaluation::infeasible().delegated());
    }
}
