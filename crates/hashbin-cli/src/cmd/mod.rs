use anyhow::Result;

use crate::args::{Cli, Command};

mod assign;
mod bins;
mod build;
mod keygen;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Keygen { out, force } => keygen::run(&out, force).await,
        Command::Bins { count } => bins::run(count).await,
        Command::Assign { count, paths } => assign::run(count, &paths).await,
        Command::Build {
            count,
            targets,
            out,
            keys,
            parent_expiry_days,
            bin_expiry_days,
            attempts,
        } => {
            let opts = build::BuildOptions {
                count,
                targets_dir: targets,
                out_dir: out,
                keys_dir: keys,
                parent_expiry_days,
                bin_expiry_days,
                attempts,
            };
            build::run(opts).await
        }
    }
}
