use std::path::PathBuf;

use virtual_lab::{AppConfig, default_bench, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional directory of per-part STL files; primitives otherwise
    let asset_dir = std::env::args_os().nth(1).map(PathBuf::from);
    if let Some(dir) = &asset_dir {
        log::info!("loading parts from {}", dir.display());
    }

    let config = AppConfig::new().manifest(default_bench(asset_dir.as_deref()));
    if let Err(e) = run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
