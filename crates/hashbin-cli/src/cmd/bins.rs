use anyhow::Result;
use serde::Serialize;

use hashbin_core::config::BinConfig;
use hashbin_core::partition::generate_bins;

use crate::output;

#[derive(Debug, Serialize)]
pub struct BinOut {
    pub name: String,
    pub low: u64,
    pub high: u64,
    pub prefixes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BinsOut {
    pub count: u32,
    pub prefix_len: usize,
    pub bin_size: u64,
    pub bins: Vec<BinOut>,
}

pub async fn run(count: u32) -> Result<()> {
    let cfg = BinConfig::new(count)?;
    let bins: Vec<BinOut> = generate_bins(&cfg)
        .into_iter()
        .map(|b| BinOut {
            name: b.name().to_string(),
            low: b.low(),
            high: b.high(),
            prefixes: b.hash_prefixes().to_vec(),
        })
        .collect();

    let width = bins.iter().map(|b| b.name.len()).max().unwrap_or(0);
    let lines: Vec<String> = bins
        .iter()
        .map(|b| format!("{:<width$}  {}", b.name, b.prefixes.join(" ")))
        .collect();

    let out = BinsOut {
        count: cfg.bin_count(),
        prefix_len: cfg.prefix_len(),
        bin_size: cfg.bin_size(),
        bins,
    };
    output::print_either(&out, &lines)
}
