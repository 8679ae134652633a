use crate::aggregate::Tally;
use crate::identity::Identity;
use serde::Serialize;

/// Fixed palette; colours are assigned by position so output is stable
/// across runs.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DonutShare {
    pub key: String,
    pub identity: Identity,
    pub value: f64,
    pub share: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Donut {
    pub shares: Vec<DonutShare>,
    pub total: f64,
}

impl Donut {
    pub fn is_empty(&self) -> bool {
        self.total == 0.0
    }
}

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Turns per-identity totals into donut slices, dropping zero-valued ones.
/// The tally is expected to be in display order already (top-N applied).
pub fn normalize(tally: &Tally<Identity>) -> Donut {
    let total = tally.total();
    let shares = tally
        .iter()
        .filter(|(_, value)| *value > 0.0)
        .enumerate()
        .map(|(i, (identity, value))| DonutShare {
            key: identity.to_string(),
            identity: identity.clone(),
            value,
            share: if total > 0.0 { value / total } else { 0.0 },
            color: palette_color(i).to_string(),
        })
        .collect();
    Donut { shares, total }
}
