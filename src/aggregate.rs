use std::collections::HashMap;

use crate::types::{DemandLine, WorkItem};

/// Key that identifies one work item. Length is compared by bit pattern so
/// that `100.0` from two lines lands in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey<'a> {
    part_number: &'a str,
    finish: &'a str,
    length_bits: u64,
    mark: &'a str,
    fabrication: &'a str,
}

impl<'a> GroupKey<'a> {
    fn of(line: &'a DemandLine) -> Self {
        Self {
            part_number: &line.part_number,
            finish: &line.finish,
            // -0.0 and 0.0 must collide
            length_bits: (line.length + 0.0).to_bits(),
            mark: &line.mark,
            fabrication: &line.fabrication,
        }
    }
}

/// Collapses demand lines into work items, one per
/// `(part, finish, length, mark, fabrication)`, in first-seen order.
pub fn aggregate(demand: &[DemandLine]) -> Vec<WorkItem> {
    let mut index: HashMap<GroupKey<'_>, usize> = HashMap::new();
    let mut items: Vec<WorkItem> = Vec::new();

    for line in demand {
        let key = GroupKey::of(line);
        match index.get(&key) {
            Some(&i) => {
                let item = &mut items[i];
                item.qty += line.qty;
                item.remaining += line.qty;
                if item.requested_stock_length.is_none() {
                    item.requested_stock_length = line.stock_length;
                }
            }
            None => {
                index.insert(key, items.len());
                items.push(WorkItem {
                    id: items.len() as u32 + 1,
                    part_number: line.part_number.clone(),
                    finish: line.finish.clone(),
                    length: line.length,
                    mark: line.mark.clone(),
                    fabrication: line.fabrication.clone(),
                    release: line.release.clone(),
                    qty: line.qty,
                    remaining: line.qty,
                    anchor_count: 0,
                    filler_count: 0,
                    drops_used_for: Vec::new(),
                    stock_length: 0.0,
                    requested_stock_length: line.stock_length,
                });
            }
        }
    }

    tracing::debug!(lines = demand.len(), items = items.len(), "aggregated demand");
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_matching_lines() {
        let demand = vec![
            DemandLine::new("A", "CLR", 100.0, 2).with_mark("M1"),
            DemandLine::new("A", "CLR", 100.0, 3).with_mark("M1").with_release("R2"),
        ];
        let items = aggregate(&demand);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].qty, 5);
        assert_eq!(items[0].remaining, 5);
        assert_eq!(items[0].release, "");
        assert_eq!(items[0].stock_length, 0.0);
        assert!(items[0].drops_used_for.is_empty());
    }

    #[test]
    fn test_every_key_field_splits_groups() {
        let base = DemandLine::new("A", "CLR", 100.0, 1);
        let demand = vec![
            base.clone(),
            DemandLine::new("B", "CLR", 100.0, 1),
            DemandLine::new("A", "BLK", 100.0, 1),
            DemandLine::new("A", "CLR", 90.0, 1),
            base.clone().with_mark("M2"),
            base.clone().with_fabrication("F1"),
            // release is not part of the key
            base.clone().with_release("R9"),
        ];
        let items = aggregate(&demand);
        assert_eq!(items.len(), 6);
        assert_eq!(items[0].qty, 2);
        let ids: Vec<u32> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_keeps_first_requested_stock_length() {
        let demand = vec![
            DemandLine::new("A", "", 100.0, 1),
            DemandLine::new("A", "", 100.0, 1).with_stock_length(288.0),
            DemandLine::new("A", "", 100.0, 1).with_stock_length(240.0),
        ];
        let items = aggregate(&demand);
        assert_eq!(items[0].requested_stock_length, Some(288.0));
    }

    #[test]
    fn test_does_not_touch_input() {
        let demand = vec![DemandLine::new("A", "", 100.0, 4)];
        let before = demand.clone();
        let _ = aggregate(&demand);
        assert_eq!(demand, before);
    }

    #[test]
    fn test_empty_demand() {
        assert!(aggregate(&[]).is_empty());
    }
}
