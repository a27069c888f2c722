use crate::error::{OptimizeError, Result};
use crate::types::{CutPlanBar, WorkItem};

/// Slack for float comparisons so that pieces summing exactly to the bar still fit.
pub const LENGTH_EPSILON: f64 = 1e-9;

/// A bar being filled. Positions refer to the packing order of a [`PackingGroup`].
#[derive(Debug, Clone)]
pub struct StockBar {
    stock_length: f64,
    kerf: f64,
    remaining: f64,
    pub placed: Vec<usize>,
}

impl StockBar {
    pub fn new(stock_length: f64, kerf: f64) -> Self {
        Self {
            stock_length,
            kerf,
            remaining: stock_length,
            placed: Vec::new(),
        }
    }

    /// Switches the bar to another stock length and clears it.
    pub fn resize(&mut self, stock_length: f64) {
        self.stock_length = stock_length;
        self.reset();
    }

    /// Clears the bar for reuse without giving up its allocation.
    pub fn reset(&mut self) {
        self.remaining = self.stock_length;
        self.placed.clear();
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Leftover length reported as waste; an anchor within one kerf of the
    /// bar end drives `remaining` below zero.
    pub fn waste(&self) -> f64 {
        self.remaining.max(0.0)
    }

    pub fn fits(&self, length: f64) -> bool {
        if self.placed.is_empty() {
            length <= self.remaining + LENGTH_EPSILON
        } else {
            length + self.kerf <= self.remaining + LENGTH_EPSILON
        }
    }

    /// First position, in packing order, with demand left that fits. Since the
    /// order is by length descending this is also the largest fitting piece.
    pub fn find_best(&self, lengths: &[f64], demand: &[u32]) -> Option<usize> {
        lengths
            .iter()
            .zip(demand)
            .position(|(&len, &qty)| qty > 0 && self.fits(len))
    }

    // Kerf is charged after every piece, the last one included.
    pub fn place(&mut self, pos: usize, length: f64) {
        self.remaining -= length + self.kerf;
        self.placed.push(pos);
    }

    /// Anchors the bar and fills it until nothing fits. Returns false when no
    /// anchor could be seated.
    pub fn fill(&mut self, lengths: &[f64], demand: &mut [u32]) -> bool {
        let Some(anchor) = self.find_best(lengths, demand) else {
            return false;
        };
        demand[anchor] -= 1;
        self.place(anchor, lengths[anchor]);

        while let Some(filler) = self.find_best(lengths, demand) {
            demand[filler] -= 1;
            self.place(filler, lengths[filler]);
        }
        true
    }
}

/// Items of one `(part, finish)` or `(part, finish, stock length)` group,
/// ordered for packing: length descending, stable for equal lengths.
#[derive(Debug, Clone)]
pub struct PackingGroup {
    part_number: String,
    finish: String,
    /// Index of each packing position in the slice the group was built from.
    members: Vec<usize>,
    lengths: Vec<f64>,
    demand: Vec<u32>,
}

impl PackingGroup {
    pub fn new<'a>(items: impl IntoIterator<Item = &'a WorkItem>) -> Self {
        let mut entries: Vec<(usize, f64, u32)> = Vec::new();
        let mut part_number = String::new();
        let mut finish = String::new();
        for (i, item) in items.into_iter().enumerate() {
            if i == 0 {
                part_number = item.part_number.clone();
                finish = item.finish.clone();
            }
            entries.push((i, item.length, item.remaining));
        }
        // sort_by is stable
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));

        Self {
            part_number,
            finish,
            members: entries.iter().map(|e| e.0).collect(),
            lengths: entries.iter().map(|e| e.1).collect(),
            demand: entries.iter().map(|e| e.2).collect(),
        }
    }

    pub fn longest(&self) -> f64 {
        self.lengths.first().copied().unwrap_or(0.0)
    }

    pub fn total_demand(&self) -> u64 {
        self.demand.iter().map(|&q| q as u64).sum()
    }

    fn invariant_error(&self, stock_length: f64) -> OptimizeError {
        tracing::error!(
            part_number = %self.part_number,
            finish = %self.finish,
            stock_length,
            "no anchor fits a fresh bar"
        );
        OptimizeError::InternalPackingInvariant {
            part_number: self.part_number.clone(),
            finish: self.finish.clone(),
            stock_length,
        }
    }

    /// Packs the whole group on a scratch copy of its demand and returns the
    /// summed leftover of every bar opened. Nothing outside the call changes.
    pub fn evaluate(&self, stock_length: f64, kerf: f64) -> Result<f64> {
        let mut demand = self.demand.clone();
        let mut left = self.total_demand();
        let mut bar = StockBar::new(stock_length, kerf);
        let mut waste = 0.0;
        while left > 0 {
            bar.reset();
            if !bar.fill(&self.lengths, &mut demand) {
                return Err(self.invariant_error(stock_length));
            }
            left -= bar.placed.len() as u64;
            waste += bar.waste();
        }
        Ok(waste)
    }

    /// Number of bars of `bar`'s stock length the group needs. `bar` and
    /// `scratch` are overwritten so repeated calls can share their buffers.
    pub fn count_bars(&self, bar: &mut StockBar, scratch: &mut Vec<u32>) -> Result<u64> {
        scratch.clear();
        scratch.extend_from_slice(&self.demand);
        let mut left = self.total_demand();
        let mut bars = 0;
        while left > 0 {
            bar.reset();
            if !bar.fill(&self.lengths, scratch) {
                return Err(self.invariant_error(bar.stock_length));
            }
            left -= bar.placed.len() as u64;
            bars += 1;
        }
        Ok(bars)
    }

    /// Packs the group for real. `items` must be the slice the group was
    /// built from; remaining quantities, counters and drop traces are updated
    /// and one [`CutPlanBar`] is returned per bar, numbered from 1.
    pub fn commit(
        &self,
        items: &mut [WorkItem],
        stock_length: f64,
        kerf: f64,
    ) -> Result<Vec<CutPlanBar>> {
        let mut demand = self.demand.clone();
        let mut left = self.total_demand();
        let mut bars = Vec::new();

        while left > 0 {
            let mut bar = StockBar::new(stock_length, kerf);
            if !bar.fill(&self.lengths, &mut demand) {
                return Err(self.invariant_error(stock_length));
            }
            left -= bar.placed.len() as u64;

            let anchor = self.members[bar.placed[0]];
            let mut cuts = Vec::with_capacity(bar.placed.len());
            for (n, &pos) in bar.placed.iter().enumerate() {
                let idx = self.members[pos];
                items[idx].remaining -= 1;
                if n == 0 {
                    items[idx].anchor_count += 1;
                } else {
                    items[idx].filler_count += 1;
                    let filler_id = items[idx].id;
                    items[anchor].drops_used_for.push(filler_id);
                }
                cuts.push(items[idx].cut());
            }

            bars.push(CutPlanBar {
                part_number: self.part_number.clone(),
                finish: self.finish.clone(),
                stock_length,
                bar_id: bars.len() as u32 + 1,
                cuts,
                remaining: bar.waste(),
            });
        }

        tracing::debug!(
            part_number = %self.part_number,
            finish = %self.finish,
            stock_length,
            bars = bars.len(),
            "packed group"
        );
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::types::DemandLine;

    fn items(demand: &[(f64, u32)]) -> Vec<WorkItem> {
        let lines: Vec<DemandLine> = demand
            .iter()
            .enumerate()
            .map(|(i, &(len, qty))| DemandLine::new("A", "", len, qty).with_mark(&format!("M{i}")))
            .collect();
        aggregate(&lines)
    }

    #[test]
    fn test_fill_three_on_one_bar() {
        let lengths = [100.0];
        let mut demand = [3];
        let mut bar = StockBar::new(310.0, 0.25);
        assert!(bar.fill(&lengths, &mut demand));
        assert_eq!(bar.placed, vec![0, 0, 0]);
        assert_eq!(demand, [0]);
        // kerf after the last cut is charged too: 310 - 3 * 100.25
        assert!((bar.remaining() - 9.25).abs() < 1e-9);
    }

    #[test]
    fn test_no_anchor() {
        let mut bar = StockBar::new(100.0, 0.0);
        assert!(!bar.fill(&[120.0], &mut [1]));
        assert!(bar.placed.is_empty());
    }

    #[test]
    fn test_full_length_anchor_fits_alone() {
        let mut bar = StockBar::new(100.0, 0.5);
        let mut demand = [2];
        assert!(bar.fill(&[100.0], &mut demand));
        assert_eq!(bar.placed.len(), 1);
        assert_eq!(bar.waste(), 0.0);
        assert_eq!(demand, [1]);
    }

    #[test]
    fn test_filler_is_largest_that_fits() {
        // 200 anchors leaving 99, 110 never fits, 60 then 30 do
        let lengths = [200.0, 110.0, 60.0, 30.0];
        let mut demand = [1, 1, 1, 1];
        let mut bar = StockBar::new(300.0, 1.0);
        assert!(bar.fill(&lengths, &mut demand));
        assert_eq!(bar.placed, vec![0, 2, 3]);
        assert_eq!(demand, [0, 1, 0, 0]);
    }

    #[test]
    fn test_kerf_blocks_exact_filler() {
        // 150 + 150 = 300 only without kerf
        let lengths = [150.0];
        let mut bar = StockBar::new(300.0, 0.0);
        let mut demand = [2];
        assert!(bar.fill(&lengths, &mut demand));
        assert_eq!(bar.placed.len(), 2);

        let mut bar = StockBar::new(300.0, 0.125);
        let mut demand = [2];
        assert!(bar.fill(&lengths, &mut demand));
        assert_eq!(bar.placed.len(), 1);
    }

    #[test]
    fn test_filler_needs_room_for_its_kerf() {
        // 200 anchors leaving 99: a 99 filler would leave no room for its
        // kerf, 98 uses the last unit exactly
        let mut bar = StockBar::new(300.0, 1.0);
        let mut demand = [1, 1, 1];
        assert!(bar.fill(&[200.0, 99.0, 98.0], &mut demand));
        assert_eq!(bar.placed, vec![0, 2]);
        assert_eq!(demand, [0, 1, 0]);
        assert!(bar.remaining().abs() < 1e-9);
    }

    #[test]
    fn test_group_order_is_stable_for_equal_lengths() {
        let items = items(&[(50.0, 1), (80.0, 1), (50.0, 1)]);
        let group = PackingGroup::new(&items);
        assert_eq!(group.members, vec![1, 0, 2]);
        assert_eq!(group.longest(), 80.0);
    }

    #[test]
    fn test_evaluate_does_not_mutate() {
        let items = items(&[(100.0, 5), (40.0, 7)]);
        let before = items.clone();
        let group = PackingGroup::new(&items);
        let waste = group.evaluate(240.0, 0.0).unwrap();
        assert!(waste >= 0.0);
        assert_eq!(items, before);
        // and again gives the same answer
        assert_eq!(group.evaluate(240.0, 0.0).unwrap(), waste);
    }

    #[test]
    fn test_evaluate_sums_waste_over_bars() {
        // two bars of 100 + 100 on 250 each, 50 left on both
        let items = items(&[(100.0, 4)]);
        let group = PackingGroup::new(&items);
        assert!((group.evaluate(250.0, 0.0).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_commit_updates_counters_and_trace() {
        let mut items = items(&[(60.0, 1), (200.0, 2), (30.0, 2)]);
        let group = PackingGroup::new(&items);
        let bars = group.commit(&mut items, 300.0, 0.0).unwrap();

        // bar 1: 200 + 60 + 30, bar 2: 200 + 30
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].bar_id, 1);
        assert_eq!(bars[1].bar_id, 2);
        let lens: Vec<f64> = bars[0].cuts.iter().map(|c| c.length).collect();
        assert_eq!(lens, vec![200.0, 60.0, 30.0]);
        assert!((bars[0].remaining - 10.0).abs() < 1e-9);
        assert!((bars[1].remaining - 70.0).abs() < 1e-9);

        assert!(items.iter().all(|i| i.remaining == 0));
        let long = &items[1];
        assert_eq!(long.anchor_count, 2);
        assert_eq!(long.drops_used_for, vec![1, 3, 3]);
        assert_eq!(items[0].filler_count, 1);
        assert_eq!(items[2].filler_count, 2);
        assert_eq!(items[2].anchor_count, 0);
    }

    #[test]
    fn test_count_bars_reuses_buffers() {
        let items = items(&[(100.0, 3), (45.0, 4)]);
        let group = PackingGroup::new(&items);
        let mut scratch = Vec::new();
        let mut bar = StockBar::new(210.0, 0.0);
        assert_eq!(group.count_bars(&mut bar, &mut scratch).unwrap(), 3);
        bar.resize(400.0);
        assert_eq!(group.count_bars(&mut bar, &mut scratch).unwrap(), 2);
        bar.resize(90.0);
        assert!(group.count_bars(&mut bar, &mut scratch).is_err());
        // the group's own demand is untouched
        assert_eq!(group.total_demand(), 7);
    }

    #[test]
    fn test_zero_demand_group_opens_nothing() {
        let mut items = items(&[(100.0, 0)]);
        let group = PackingGroup::new(&items);
        assert!(group.commit(&mut items, 50.0, 0.0).unwrap().is_empty());
        assert_eq!(group.evaluate(50.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_invariant_error_when_nothing_fits() {
        let mut items = items(&[(400.0, 1)]);
        let group = PackingGroup::new(&items);
        let err = group.commit(&mut items, 300.0, 0.0).unwrap_err();
        assert!(matches!(err, OptimizeError::InternalPackingInvariant { .. }));
        assert!(!err.is_user_error());
    }
}
