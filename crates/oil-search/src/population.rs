//! 族群與遺傳運算子（選擇、交配、突變）

use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// 個體：基因與其適應度
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub genes: Vec<u8>,
    pub fitness: f64,
}

impl Individual {
    pub fn new(genes: Vec<u8>, fitness: f64) -> Self {
        Self { genes, fitness }
    }
}

/// 隨機產生基因值為 {0, 1} 的初始族群
pub fn random_population<R: Rng>(rng: &mut R, size: usize, num_genes: usize) -> Vec<Vec<u8>> {
    (0..size)
        .map(|_| (0..num_genes).map(|_| rng.gen_range(0..=1u8)).collect())
        .collect()
}

/// 族群中適應度最高的個體（同分時取最前者）
pub fn best(population: &[Individual]) -> Option<&Individual> {
    population.iter().fold(None, |best: Option<&Individual>, candidate| match best {
        Some(b) if b.fitness >= candidate.fitness => Some(b),
        _ => Some(candidate),
    })
}

/// 排名選擇：依適應度由低到高給予名次 1..n，以名次為權重輪盤抽出親代（可重複）
pub fn rank_selection<R: Rng>(
    rng: &mut R,
    population: &[Individual],
    num_parents: usize,
) -> Vec<Individual> {
    if population.is_empty() || num_parents == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| population[a].fitness.total_cmp(&population[b].fitness));

    let ranks: Vec<usize> = (1..=order.len()).collect();
    let Ok(wheel) = WeightedIndex::new(&ranks) else {
        return order
            .iter()
            .rev()
            .take(num_parents)
            .map(|&i| population[i].clone())
            .collect();
    };

    (0..num_parents)
        .map(|_| population[order[wheel.sample(rng)]].clone())
        .collect()
}

/// 單點交配：親代依序成對（k, k+1），交配點前取第一親代，之後取第二親代
pub fn single_point_crossover<R: Rng>(
    rng: &mut R,
    parents: &[Individual],
    num_offspring: usize,
) -> Vec<Vec<u8>> {
    if parents.is_empty() {
        return Vec::new();
    }

    (0..num_offspring)
        .map(|k| {
            let first = &parents[k % parents.len()].genes;
            let second = &parents[(k + 1) % parents.len()].genes;
            let point = rng.gen_range(0..first.len().max(1));

            first[..point]
                .iter()
                .chain(second[point..].iter())
                .copied()
                .collect()
        })
        .collect()
}

/// 翻轉突變：隨機挑選 `num_genes` 個不同位置並翻轉
pub fn flip_mutation<R: Rng>(rng: &mut R, genes: &mut [u8], num_genes: usize) {
    let amount = num_genes.min(genes.len());
    for index in rand::seq::index::sample(rng, genes.len(), amount) {
        genes[index] ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn individuals(fitness: &[f64]) -> Vec<Individual> {
        fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| Individual::new(vec![i as u8; 4], f))
            .collect()
    }

    #[test]
    fn test_random_population_is_binary() {
        let mut rng = StdRng::seed_from_u64(1);
        let population = random_population(&mut rng, 6, 30);

        assert_eq!(population.len(), 6);
        assert!(population.iter().all(|genes| genes.len() == 30));
        assert!(population.iter().flatten().all(|&g| g <= 1));
    }

    #[test]
    fn test_best_prefers_first_on_tie() {
        let population = individuals(&[-5.0, 3.0, 3.0, 1.0]);
        let best = best(&population).unwrap();

        assert_eq!(best.fitness, 3.0);
        assert_eq!(best.genes, vec![1; 4]);
        assert!(super::best(&[]).is_none());
    }

    #[test]
    fn test_rank_selection_favours_high_fitness() {
        let mut rng = StdRng::seed_from_u64(42);
        let population = individuals(&[-1e9, 10.0, 20.0, 30.0]);

        let parents = rank_selection(&mut rng, &population, 4000);
        let worst = parents.iter().filter(|p| p.fitness == -1e9).count();
        let top = parents.iter().filter(|p| p.fitness == 30.0).count();

        assert_eq!(parents.len(), 4000);
        // 名次權重 1:2:3:4
        assert!(top > worst * 2, "top = {}, worst = {}", top, worst);
    }

    #[test]
    fn test_single_point_crossover_mixes_parents() {
        let mut rng = StdRng::seed_from_u64(3);
        let parents = vec![
            Individual::new(vec![0; 10], 1.0),
            Individual::new(vec![1; 10], 2.0),
        ];

        let offspring = single_point_crossover(&mut rng, &parents, 6);
        assert_eq!(offspring.len(), 6);
        for (k, child) in offspring.iter().enumerate() {
            assert_eq!(child.len(), 10);
            // 前段來自第一親代，後段來自第二親代
            let head = if k % 2 == 0 { 0 } else { 1 };
            let split = child.iter().position(|&g| g != head).unwrap_or(child.len());
            assert!(child[..split].iter().all(|&g| g == head));
            assert!(child[split..].iter().all(|&g| g == 1 - head));
        }
    }

    #[test]
    fn test_flip_mutation_flips_exact_count() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut genes = vec![0u8; 30];

        flip_mutation(&mut rng, &mut genes, 4);
        assert_eq!(genes.iter().filter(|&&g| g == 1).count(), 4);

        flip_mutation(&mut rng, &mut genes, 0);
        assert_eq!(genes.iter().filter(|&&g| g == 1).count(), 4);
    }
}
