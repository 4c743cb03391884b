use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use hashbin_core::keys::KeyPair;

use crate::io::keys::{self, BIN_KEY_FILE, PARENT_KEY_FILE};
use crate::output;

#[derive(Debug, Serialize)]
pub struct KeygenOut {
    pub out_dir: String,
    pub parent_key_id: String,
    pub bin_key_id: String,
}

pub async fn run(out_dir: &str, force: bool) -> Result<()> {
    let dir = Path::new(out_dir);
    let parent = KeyPair::generate();
    let bin = KeyPair::generate();

    keys::write_key(&dir.join(PARENT_KEY_FILE), &parent, force)?;
    keys::write_key(&dir.join(BIN_KEY_FILE), &bin, force)?;

    let out = KeygenOut {
        out_dir: out_dir.to_string(),
        parent_key_id: parent.key_id()?,
        bin_key_id: bin.key_id()?,
    };
    tracing::info!(parent = %out.parent_key_id, bin = %out.bin_key_id, "generated keys");
    output::print_either(
        &out,
        &[
            format!("{PARENT_KEY_FILE}  {}", out.parent_key_id),
            format!("{BIN_KEY_FILE}  {}", out.bin_key_id),
        ],
    )
}
