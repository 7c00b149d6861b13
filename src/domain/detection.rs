use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Un objeto segmentado tal y como se devuelve al cliente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub id: usize,
    pub label: String,
    pub confidence: f64,
    pub polygon: Vec<[f64; 2]>,
    pub bounding_box: Option<[f64; 4]>,
}

/// Redondea a `decimals` cifras decimales.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Resumen legible para logs: "2 plastic, 1 glass".
pub fn summarize_counts(counts: &BTreeMap<String, usize>) -> String {
    if counts.is_empty() {
        return "nothing detected".to_string();
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_requested_precision() {
        assert_eq!(round_to(0.87654, 4), 0.8765);
        assert_eq!(round_to(12.345_678, 2), 12.35);
        assert_eq!(round_to(3.0, 2), 3.0);
    }

    #[test]
    fn summary_lists_every_label() {
        let mut counts = BTreeMap::new();
        counts.insert("glass".to_string(), 1);
        counts.insert("plastic".to_string(), 2);
        assert_eq!(summarize_counts(&counts), "1 glass, 2 plastic");
        assert_eq!(summarize_counts(&BTreeMap::new()), "nothing detected");
    }
}
