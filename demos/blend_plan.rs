//! 食用油混合規劃示例
//!
//! 執行：`cargo run --example blend_plan [--search] [--fixed]`

use oil_core::{month_label, product_label, O_NUM};
use oil_plan::{load_inputs, FinalSolveMode, PlanningRun};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let use_search = args.iter().any(|a| a == "--search");
    let final_mode = if args.iter().any(|a| a == "--fixed") {
        FinalSolveMode::FixedDecisions
    } else {
        FinalSolveMode::Exact
    };

    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/data");
    let (scenario, search_config) =
        load_inputs(data_dir.join("food_manufacture.json"), data_dir.join("search.json"))?;

    println!("=== 食用油混合規劃示例 ===\n");
    println!("規劃月數: {}，每月最多使用 {} 種產品", scenario.months, scenario.max_active_products);

    let mut run = PlanningRun::new(&scenario).with_final_mode(final_mode);
    if use_search {
        run = run.with_search(search_config);
    }
    let report = run.run()?;

    if let Some(search) = &report.search {
        println!("\n搜尋完成：{} 代，最佳適應度 {:.2}", search.generations_completed, search.best_fitness);
        println!("  {}", search.stats);
    }

    let Some(solution) = &report.solution else {
        println!("\n找不到可行解");
        return Ok(());
    };

    println!("\n每月使用量（噸）:");
    for m in 0..solution.months() {
        let usage: Vec<String> = (0..O_NUM)
            .map(|o| format!("{} {:>7.2}", product_label(o), solution.used[m][o]))
            .collect();
        println!("  {}: {}", month_label(m), usage.join("  "));
    }

    println!("\n收入: {:.2}", solution.revenue);
    println!("採購成本: {:.2}", solution.purchase_cost);
    println!("庫存成本: {:.2}", solution.storage_cost);
    println!("利潤: {:.2}", solution.objective);

    Ok(())
}
