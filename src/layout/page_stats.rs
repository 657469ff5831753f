use crate::core::model::Line;

/// Gap and height statistics of one page. Rebuilt for every page and never
/// shared between pages.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStatistics {
    pub mean_height: f32,
    pub median_height: f32,
    pub std_height: f32,
    pub mean_font_size: f32,
    /// Positive gaps between vertically consecutive lines.
    pub gaps: Vec<f32>,
    pub mean_gap: f32,
    pub median_gap: f32,
    pub std_gap: f32,
    /// Typical spacing between lines of the same paragraph.
    pub typical_line_gap: f32,
    /// Gap above which two lines are always split.
    pub dynamic_paragraph_threshold: f32,
}

impl PageStatistics {
    /// `lines` must be sorted by `(y0, x0)`.
    pub fn from_lines(lines: &[Line]) -> Self {
        let heights: Vec<f32> = lines.iter().map(|line| line.height).collect();
        let font_sizes: Vec<f32> = lines.iter().map(|line| line.font_size).collect();
        let gaps: Vec<f32> = lines
            .windows(2)
            .map(|pair| pair[1].bbox.y0 - pair[0].bbox.y1)
            .filter(|gap| *gap > 0.0)
            .collect();

        let mean_height = mean(&heights).unwrap_or(12.0);
        let median_height = median(&heights).unwrap_or(12.0);
        let std_height = std_dev(&heights).unwrap_or(2.0);
        let mean_font_size = mean(&font_sizes).unwrap_or(12.0);
        let mean_gap = mean(&gaps).unwrap_or(2.0);
        let median_gap = median(&gaps).unwrap_or(2.0);
        let std_gap = std_dev(&gaps).unwrap_or(1.0);

        let (typical_line_gap, dynamic_paragraph_threshold) = if gaps.len() > 3 {
            let q75 = percentile(&gaps, 75.0);
            let q25 = percentile(&gaps, 25.0);
            let line_gaps: Vec<f32> = gaps.iter().copied().filter(|gap| *gap <= q75).collect();
            let typical = mean(&line_gaps).unwrap_or(mean_gap);
            let threshold = (typical * 1.2)
                .max(mean_height * 0.6)
                .max(q25 + std_gap * 0.3);
            (typical, threshold)
        } else {
            (mean_gap, (mean_height * 0.6).max(mean_gap * 1.2))
        };

        Self {
            mean_height,
            median_height,
            std_height,
            mean_font_size,
            gaps,
            mean_gap,
            median_gap,
            std_gap,
            typical_line_gap,
            dynamic_paragraph_threshold,
        }
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

/// Population standard deviation.
fn std_dev(values: &[f32]) -> Option<f32> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f32>() / values.len() as f32;
    Some(variance.sqrt())
}

fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(percentile(values, 50.0))
    }
}

/// Linearly interpolated percentile; `values` must be non-empty.
fn percentile(values: &[f32], pct: f32) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let rank = pct / 100.0 * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f32)
}
