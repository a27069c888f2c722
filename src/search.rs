use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::aggregate::aggregate;
use crate::error::{OptimizeError, Result};
use crate::packer::{PackingGroup, StockBar};
use crate::types::{DemandLine, WorkItem};

/// Tries every whole stock length in a range and keeps the one that consumes
/// the least material (`length * bars`), preferring the shorter length on ties.
pub struct BestLengthSearch<'a> {
    demand: &'a [DemandLine],
    min_length: u32,
    max_length: u32,
    kerf: f64,
    parallel: bool,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> BestLengthSearch<'a> {
    pub fn new(demand: &'a [DemandLine], min_length: u32, max_length: u32, kerf: f64) -> Self {
        Self {
            demand,
            min_length,
            max_length,
            kerf,
            parallel: false,
            cancel: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checked before each candidate length; once set the search stops with
    /// [`OptimizeError::Cancelled`].
    pub fn cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn run(&self) -> Result<u32> {
        let items = aggregate(self.demand);
        let groups = part_groups(&items);

        let longest = items
            .iter()
            .filter(|i| i.qty > 0)
            .map(|i| i.length)
            .max_by(|a, b| a.total_cmp(b));
        let min = match longest {
            Some(l) => self.min_length.max((l.floor() as u32).saturating_add(1)),
            None => self.min_length,
        };
        let max = self.max_length;
        if min > max {
            return Err(OptimizeError::InvalidSearchRange { min, max });
        }

        let best = if self.parallel {
            (min..=max)
                .into_par_iter()
                .map_init(
                    || (StockBar::new(0.0, self.kerf), Vec::new()),
                    |(bar, scratch), length| {
                        if self.cancelled() {
                            return Err(OptimizeError::Cancelled);
                        }
                        material_used(&groups, length, bar, scratch).map(|c| (c, length))
                    },
                )
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .min()
        } else {
            let mut bar = StockBar::new(0.0, self.kerf);
            let mut scratch = Vec::new();
            let mut best: Option<(u64, u32)> = None;
            for length in min..=max {
                if self.cancelled() {
                    return Err(OptimizeError::Cancelled);
                }
                let cost = material_used(&groups, length, &mut bar, &mut scratch)?;
                if best.is_none_or(|(c, _)| cost < c) {
                    best = Some((cost, length));
                }
            }
            best
        };
        let (cost, length) = best.ok_or(OptimizeError::InvalidSearchRange { min, max })?;

        tracing::info!(length, material = cost, min, max, "best stock length found");
        Ok(length)
    }
}

/// One packing group per `(part, finish)`; every group is cut from the same
/// candidate length during the search.
fn part_groups(items: &[WorkItem]) -> Vec<PackingGroup> {
    let mut keys: Vec<(&str, &str)> = Vec::new();
    for item in items {
        let key = (item.part_number.as_str(), item.finish.as_str());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.into_iter()
        .map(|(part, finish)| {
            PackingGroup::new(
                items
                    .iter()
                    .filter(|i| i.part_number == part && i.finish == finish),
            )
        })
        .collect()
}

fn material_used(
    groups: &[PackingGroup],
    length: u32,
    bar: &mut StockBar,
    scratch: &mut Vec<u32>,
) -> Result<u64> {
    bar.resize(length as f64);
    let mut bars = 0;
    for group in groups {
        bars += group.count_bars(bar, scratch)?;
    }
    tracing::trace!(length, bars, "candidate length");
    Ok(bars * length as u64)
}
