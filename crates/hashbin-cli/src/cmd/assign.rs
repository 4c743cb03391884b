use anyhow::Result;
use serde::Serialize;

use hashbin_core::config::BinConfig;
use hashbin_core::partition::{bin_for_prefix, path_prefix};

use crate::output;

#[derive(Debug, Serialize)]
pub struct AssignOut {
    pub path: String,
    pub prefix: String,
    pub bin: String,
}

pub async fn run(count: u32, paths: &[String]) -> Result<()> {
    let cfg = BinConfig::new(count)?;
    let width = cfg.prefix_len();

    let mut out = Vec::with_capacity(paths.len());
    for p in paths {
        if p.is_empty() {
            anyhow::bail!("target path must not be empty");
        }
        let prefix = path_prefix(&cfg, p)?;
        out.push(AssignOut {
            path: p.clone(),
            prefix: format!("{prefix:0width$x}"),
            bin: bin_for_prefix(&cfg, prefix),
        });
    }

    let lines: Vec<String> = out
        .iter()
        .map(|a| format!("{}\t{}\t{}", a.bin, a.prefix, a.path))
        .collect();
    output::print_either(&out, &lines)
}
