use serde::{Deserialize, Deserializer, Serialize};

/// Raw demand line as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandLine {
    pub part_number: String,
    #[serde(default)]
    pub finish: String,
    pub length: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    #[serde(default)]
    pub mark: String,
    #[serde(default)]
    pub fabrication: String,
    #[serde(default)]
    pub release: String,
    /// Stock length the line would like to be cut from, if any.
    #[serde(default)]
    pub stock_length: Option<f64>,
}

impl DemandLine {
    pub fn new(part_number: &str, finish: &str, length: f64, qty: u32) -> Self {
        Self {
            part_number: part_number.to_string(),
            finish: finish.to_string(),
            length,
            qty,
            mark: String::new(),
            fabrication: String::new(),
            release: String::new(),
            stock_length: None,
        }
    }

    pub fn with_mark(mut self, mark: &str) -> Self {
        self.mark = mark.to_string();
        self
    }

    pub fn with_fabrication(mut self, fabrication: &str) -> Self {
        self.fabrication = fabrication.to_string();
        self
    }

    pub fn with_release(mut self, release: &str) -> Self {
        self.release = release.to_string();
        self
    }

    pub fn with_stock_length(mut self, stock_length: f64) -> Self {
        self.stock_length = Some(stock_length);
        self
    }
}

/// Catalog row: one stock length, or a choice between two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOption {
    pub part_number: String,
    #[serde(default)]
    pub finish: String,
    pub length1: f64,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub qty1: u32,
    #[serde(default)]
    pub length2: f64,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub qty2: u32,
}

impl StockOption {
    pub fn single(part_number: &str, finish: &str, length: f64, qty: u32) -> Self {
        Self {
            part_number: part_number.to_string(),
            finish: finish.to_string(),
            length1: length,
            qty1: qty,
            length2: 0.0,
            qty2: 0,
        }
    }

    pub fn choice(
        part_number: &str,
        finish: &str,
        (length1, qty1): (f64, u32),
        (length2, qty2): (f64, u32),
    ) -> Self {
        Self {
            part_number: part_number.to_string(),
            finish: finish.to_string(),
            length1,
            qty1,
            length2,
            qty2,
        }
    }

    pub fn has_choice(&self) -> bool {
        self.length2 > 0.0 && self.qty2 > 0
    }

    pub fn matches(&self, part_number: &str, finish: &str) -> bool {
        self.part_number == part_number && self.finish == finish
    }

    /// Positive candidate lengths in catalog order.
    pub fn lengths(&self) -> impl Iterator<Item = f64> {
        [self.length1, self.length2].into_iter().filter(|l| *l > 0.0)
    }
}

/// Unique demand group, mutated by the packing engine during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u32,
    pub part_number: String,
    pub finish: String,
    pub length: f64,
    pub mark: String,
    pub fabrication: String,
    pub release: String,
    pub qty: u32,
    pub remaining: u32,
    pub anchor_count: u32,
    pub filler_count: u32,
    /// Ids of items cut as drops from bars this item anchored, in placement order.
    pub drops_used_for: Vec<u32>,
    pub stock_length: f64,
    pub requested_stock_length: Option<f64>,
}

impl WorkItem {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn cut(&self) -> Cut {
        Cut {
            item_id: self.id,
            part_number: self.part_number.clone(),
            length: self.length,
            mark: self.mark.clone(),
            finish: self.finish.clone(),
            fabrication: self.fabrication.clone(),
            release: self.release.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub item_id: u32,
    pub part_number: String,
    pub length: f64,
    pub mark: String,
    pub finish: String,
    pub fabrication: String,
    pub release: String,
}

/// One physical stock bar and the pieces cut from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPlanBar {
    pub part_number: String,
    pub finish: String,
    pub stock_length: f64,
    pub bar_id: u32,
    pub cuts: Vec<Cut>,
    pub remaining: f64,
}

impl CutPlanBar {
    pub fn cut_length(&self) -> f64 {
        self.cuts.iter().map(|c| c.length).sum()
    }
}

impl std::fmt::Display for CutPlanBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} @ {} #{}",
            self.part_number, self.finish, self.stock_length, self.bar_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockConsumption {
    pub part_number: String,
    pub finish: String,
    pub stock_length: f64,
    pub bars: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub total_stock_length: f64,
    pub total_cut_length: f64,
    pub waste_length: f64,
    pub waste_percent: f64,
    pub utilization_percent: f64,
    pub bar_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub cut_pattern: Vec<CutPlanBar>,
    pub stock_lengths_needed: Vec<StockConsumption>,
    pub summary: OptimizationSummary,
    pub work_items: Vec<WorkItem>,
}

impl OptimizationResult {
    pub fn bar_count(&self) -> usize {
        self.cut_pattern.len()
    }
}

/// Accepts `3` as well as `3.0`, since spreadsheet exports often send the latter.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )));
    }
    Ok(value as u32)
}
