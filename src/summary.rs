use crate::types::{CutPlanBar, OptimizationSummary};

pub fn summarize(bars: &[CutPlanBar]) -> OptimizationSummary {
    let total_stock_length: f64 = bars.iter().map(|b| b.stock_length).sum();
    let total_cut_length: f64 = bars.iter().map(|b| b.cut_length()).sum();
    let waste_length = total_stock_length - total_cut_length;

    let (waste_percent, utilization_percent) = if total_stock_length > 0.0 {
        let waste = waste_length / total_stock_length * 100.0;
        (waste, 100.0 - waste)
    } else {
        (0.0, 0.0)
    };

    OptimizationSummary {
        total_stock_length,
        total_cut_length,
        waste_length,
        waste_percent,
        utilization_percent,
        bar_count: bars.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cut;

    fn bar(stock_length: f64, cuts: &[f64]) -> CutPlanBar {
        CutPlanBar {
            part_number: "A".into(),
            finish: String::new(),
            stock_length,
            bar_id: 1,
            cuts: cuts
                .iter()
                .map(|&length| Cut {
                    item_id: 1,
                    part_number: "A".into(),
                    length,
                    mark: String::new(),
                    finish: String::new(),
                    fabrication: String::new(),
                    release: String::new(),
                })
                .collect(),
            remaining: 0.0,
        }
    }

    #[test]
    fn test_empty_plan() {
        let s = summarize(&[]);
        assert_eq!(s, OptimizationSummary::default());
    }

    #[test]
    fn test_totals() {
        let s = summarize(&[bar(310.0, &[100.0, 100.0, 100.0]), bar(200.0, &[150.0])]);
        assert_eq!(s.bar_count, 2);
        assert_eq!(s.total_stock_length, 510.0);
        assert_eq!(s.total_cut_length, 450.0);
        assert_eq!(s.waste_length, 60.0);
        assert!((s.waste_percent - 60.0 / 510.0 * 100.0).abs() < 1e-9);
        assert!((s.utilization_percent + s.waste_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_waste() {
        let s = summarize(&[bar(200.0, &[100.0, 100.0])]);
        assert_eq!(s.waste_percent, 0.0);
        assert_eq!(s.utilization_percent, 100.0);
    }
}
