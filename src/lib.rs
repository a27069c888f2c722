//! Cutting-stock optimizer for linear parts such as aluminum extrusions.
//!
//! Demand lines are collapsed into work items, checked against the stock
//! catalog, given a stock length, and packed bar by bar with a greedy
//! best-fit heuristic that charges the saw kerf after every cut.
//! [`find_best_stock_length`] searches a range of whole lengths for the one
//! that consumes the least material.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod packer;
pub mod render;
pub mod search;
pub mod select;
pub mod solver;
pub mod summary;
pub mod types;
pub mod validate;

pub use error::{OptimizeError, Result};
pub use search::BestLengthSearch;
pub use solver::Solver;
pub use types::{
    Cut, CutPlanBar, DemandLine, OptimizationResult, OptimizationSummary, StockConsumption,
    StockOption, WorkItem,
};

/// Cuts `demand` from the stock lengths offered in `stock`.
pub fn optimize(
    demand: &[DemandLine],
    stock: &[StockOption],
    kerf: f64,
) -> Result<OptimizationResult> {
    Solver::new(demand, stock, kerf).solve()
}

/// Whole stock length in `[min_length, max_length]` that consumes the least
/// material for `demand`. Lengths not longer than the longest piece are skipped.
pub fn find_best_stock_length(
    demand: &[DemandLine],
    min_length: u32,
    max_length: u32,
    kerf: f64,
) -> Result<u32> {
    BestLengthSearch::new(demand, min_length, max_length, kerf).run()
}

/// Catalog offering one stock length for every `(part, finish)` in `demand`,
/// used to feed a searched length back into [`optimize`].
pub fn single_length_catalog(demand: &[DemandLine], length: f64) -> Vec<StockOption> {
    let mut stock: Vec<StockOption> = Vec::new();
    for line in demand {
        if !stock.iter().any(|o| o.matches(&line.part_number, &line.finish)) {
            stock.push(StockOption::single(&line.part_number, &line.finish, length, 1));
        }
    }
    stock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_then_optimize() {
        let demand = vec![
            DemandLine::new("A", "CLR", 100.0, 5),
            DemandLine::new("A", "CLR", 64.5, 3).with_mark("M2"),
            DemandLine::new("B", "", 100.0, 2),
        ];
        let length = find_best_stock_length(&demand, 180, 210, 0.125).unwrap();
        assert!((180..=210).contains(&length));

        let stock = single_length_catalog(&demand, length as f64);
        assert_eq!(stock.len(), 2);
        let res = optimize(&demand, &stock, 0.125).unwrap();
        assert!(res.cut_pattern.iter().all(|b| b.stock_length == length as f64));
        assert_eq!(res.cut_pattern.iter().map(|b| b.cuts.len()).sum::<usize>(), 10);
    }
}
