use rayon::prelude::*;

use crate::aggregate::aggregate;
use crate::error::Result;
use crate::packer::PackingGroup;
use crate::select::{assign_remaining, select_stock_lengths};
use crate::summary::summarize;
use crate::types::{
    CutPlanBar, DemandLine, OptimizationResult, StockConsumption, StockOption, WorkItem,
};
use crate::validate::check_feasible;

pub struct Solver<'a> {
    demand: &'a [DemandLine],
    stock: &'a [StockOption],
    kerf: f64,
    parallel: bool,
}

impl<'a> Solver<'a> {
    pub fn new(demand: &'a [DemandLine], stock: &'a [StockOption], kerf: f64) -> Self {
        Self {
            demand,
            stock,
            kerf,
            parallel: false,
        }
    }

    /// Pack independent stock groups on the rayon pool. The plan is the same
    /// either way.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn solve(&self) -> Result<OptimizationResult> {
        check_feasible(self.demand, self.stock)?;

        let mut items = aggregate(self.demand);
        select_stock_lengths(&mut items, self.stock, self.kerf)?;
        assign_remaining(&mut items, self.stock);

        let plan = assemble_plan(items, self.kerf, self.parallel)?;
        let summary = summarize(&plan.bars);
        tracing::info!(
            bars = summary.bar_count,
            waste_percent = summary.waste_percent,
            kerf = self.kerf,
            "optimized cut plan"
        );

        Ok(OptimizationResult {
            cut_pattern: plan.bars,
            stock_lengths_needed: plan.consumption,
            summary,
            work_items: plan.items,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AssembledPlan {
    pub bars: Vec<CutPlanBar>,
    pub consumption: Vec<StockConsumption>,
    /// Work items after packing, ordered by id.
    pub items: Vec<WorkItem>,
}

/// Packs every `(part, finish, stock length)` group until its demand is used
/// up. Items must already carry their stock length.
pub fn assemble_plan(items: Vec<WorkItem>, kerf: f64, parallel: bool) -> Result<AssembledPlan> {
    let mut groups = split_groups(items);

    let packed: Vec<Vec<CutPlanBar>> = if parallel {
        groups
            .par_iter_mut()
            .map(|g| pack_group(g, kerf))
            .collect::<Result<_>>()?
    } else {
        groups
            .iter_mut()
            .map(|g| pack_group(g, kerf))
            .collect::<Result<_>>()?
    };

    let mut consumption = Vec::new();
    for (group, bars) in groups.iter().zip(&packed) {
        if bars.is_empty() {
            continue;
        }
        consumption.push(StockConsumption {
            part_number: group[0].part_number.clone(),
            finish: group[0].finish.clone(),
            stock_length: group[0].stock_length,
            bars: bars.len() as u32,
        });
    }

    let mut items: Vec<WorkItem> = groups.into_iter().flatten().collect();
    items.sort_by_key(|i| i.id);

    Ok(AssembledPlan {
        bars: packed.into_iter().flatten().collect(),
        consumption,
        items,
    })
}

fn same_group(a: &WorkItem, b: &WorkItem) -> bool {
    a.part_number == b.part_number && a.finish == b.finish && a.stock_length == b.stock_length
}

/// Moves items into groups keyed by `(part, finish, stock length)`, groups in
/// first-seen order, items in their original order within a group.
fn split_groups(items: Vec<WorkItem>) -> Vec<Vec<WorkItem>> {
    let mut groups: Vec<Vec<WorkItem>> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|g| same_group(&g[0], &item)) {
            Some(group) => group.push(item),
            None => groups.push(vec![item]),
        }
    }
    groups
}

fn pack_group(items: &mut [WorkItem], kerf: f64) -> Result<Vec<CutPlanBar>> {
    let Some(first) = items.first() else {
        return Ok(Vec::new());
    };
    let stock_length = first.stock_length;
    let group = PackingGroup::new(items.iter());
    group.commit(items, stock_length, kerf)
}
