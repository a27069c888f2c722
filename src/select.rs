use std::collections::HashSet;

use crate::error::Result;
use crate::packer::{LENGTH_EPSILON, PackingGroup};
use crate::types::{StockOption, WorkItem};

/// Picks the candidate length with the least simulated waste for every
/// `(part, finish)` whose catalog row offers a choice, and assigns it to all
/// items of that group. Ties go to the candidate listed first.
pub fn select_stock_lengths(
    items: &mut [WorkItem],
    stock: &[StockOption],
    kerf: f64,
) -> Result<()> {
    let mut decided: HashSet<(&str, &str)> = HashSet::new();

    for opt in stock.iter().filter(|o| o.has_choice()) {
        if !decided.insert((opt.part_number.as_str(), opt.finish.as_str())) {
            tracing::debug!(part_number = %opt.part_number, finish = %opt.finish, "duplicate choice row skipped");
            continue;
        }

        let members: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| opt.matches(&item.part_number, &item.finish))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        let group = PackingGroup::new(members.iter().map(|&i| &items[i]));
        let mut best: Option<(f64, f64)> = None;
        for (length, qty) in [(opt.length1, opt.qty1), (opt.length2, opt.qty2)] {
            if length <= 0.0 || qty == 0 {
                continue;
            }
            if length + LENGTH_EPSILON < group.longest() {
                tracing::debug!(part_number = %opt.part_number, length, "candidate too short for group");
                continue;
            }
            let waste = group.evaluate(length, kerf)?;
            tracing::debug!(part_number = %opt.part_number, finish = %opt.finish, length, waste, "evaluated candidate");
            // summed float waste; a later candidate must win by more than noise
            if best.is_none_or(|(_, w)| waste < w - LENGTH_EPSILON) {
                best = Some((length, waste));
            }
        }

        if let Some((length, _)) = best {
            for &i in &members {
                items[i].stock_length = length;
            }
        }
    }
    Ok(())
}

/// Gives every item the selector left unassigned a stock length: its
/// requested length when the catalog offers it and it holds the piece, else
/// the first single-length row that holds it, else the longest candidate.
pub fn assign_remaining(items: &mut [WorkItem], stock: &[StockOption]) {
    for item in items.iter_mut().filter(|i| i.stock_length == 0.0) {
        let rows: Vec<&StockOption> = stock
            .iter()
            .filter(|o| o.matches(&item.part_number, &item.finish))
            .collect();
        let length = item.length;
        let holds = |l: f64| l + LENGTH_EPSILON >= length;

        if let Some(requested) = item.requested_stock_length {
            let offered = rows
                .iter()
                .flat_map(|o| o.lengths())
                .any(|l| (l - requested).abs() <= LENGTH_EPSILON);
            if offered && holds(requested) {
                item.stock_length = requested;
                continue;
            }
            tracing::warn!(
                part_number = %item.part_number,
                finish = %item.finish,
                requested,
                "requested stock length ignored"
            );
        }

        if let Some(opt) = rows
            .iter()
            .find(|o| !o.has_choice() && o.length1 > 0.0 && holds(o.length1))
        {
            item.stock_length = opt.length1;
            continue;
        }

        if let Some(longest) = rows
            .iter()
            .flat_map(|o| o.lengths())
            .max_by(|a, b| a.total_cmp(b))
        {
            item.stock_length = longest;
        }
    }
}
