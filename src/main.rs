use anyhow::Context;
use clap::Parser;

use weldview::{
    config::{CliArgs, ViewerConfig},
    gfx::scene::load_mesh,
    ViewerApp,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let config = args.apply(ViewerConfig::default());

    let mesh = load_mesh(&args.mesh)
        .with_context(|| format!("failed to load mesh {}", args.mesh.display()))?;

    ViewerApp::new(config, mesh)?.run()
}
