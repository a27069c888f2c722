use std::collections::HashMap;

use crate::error::{OptimizeError, Result};
use crate::types::{DemandLine, StockOption};

/// Part numbers whose demand no stock option can hold, deduplicated in
/// first-seen order.
pub fn infeasible_parts(demand: &[DemandLine], stock: &[StockOption]) -> Vec<String> {
    let mut candidates: HashMap<(&str, &str), Vec<f64>> = HashMap::new();
    for opt in stock {
        candidates
            .entry((opt.part_number.as_str(), opt.finish.as_str()))
            .or_default()
            .extend(opt.lengths());
    }

    let mut offending: Vec<String> = Vec::new();
    for line in demand {
        let fits = candidates
            .get(&(line.part_number.as_str(), line.finish.as_str()))
            .is_some_and(|lengths| lengths.iter().any(|&l| l >= line.length));
        if !fits && !offending.contains(&line.part_number) {
            offending.push(line.part_number.clone());
        }
    }
    offending
}

pub fn check_feasible(demand: &[DemandLine], stock: &[StockOption]) -> Result<()> {
    let parts = infeasible_parts(demand, stock);
    if parts.is_empty() {
        Ok(())
    } else {
        tracing::info!(?parts, "demand exceeds stock");
        Err(OptimizeError::DemandExceedsStock { parts })
    }
}
