use crate::types::CutPlanBar;

const MAX_WIDTH: f64 = 80.0;

/// Draws a bar as a one-line strip, one segment per cut and a trailing waste
/// segment, scaled to at most `MAX_WIDTH` columns:
///
/// ```text
/// |  100  |  100  |  100  |.|
/// ```
pub fn render_bar(bar: &CutPlanBar) -> String {
    if bar.stock_length <= 0.0 {
        return String::new();
    }
    let scale = MAX_WIDTH / bar.stock_length;

    let mut line = String::from("|");
    for cut in &bar.cuts {
        let cols = ((cut.length * scale).round() as usize).max(1);
        line.push_str(&segment(&format_length(cut.length), cols, ' '));
        line.push('|');
    }

    let waste_cols = (bar.remaining * scale).round() as usize;
    if waste_cols > 0 {
        line.push_str(&".".repeat(waste_cols));
        line.push('|');
    }
    line
}

/// `label` centered in `cols` columns, dropped when it does not fit.
fn segment(label: &str, cols: usize, fill: char) -> String {
    let len = label.chars().count();
    if len > cols {
        return fill.to_string().repeat(cols);
    }
    let left = (cols - len) / 2;
    let right = cols - len - left;
    format!(
        "{}{}{}",
        fill.to_string().repeat(left),
        label,
        fill.to_string().repeat(right)
    )
}

fn format_length(length: f64) -> String {
    if length.fract() == 0.0 {
        format!("{length:.0}")
    } else {
        let s = format!("{length:.3}");
        s.trim_end_matches('0').to_string()
    }
}
