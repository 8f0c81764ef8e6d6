use edgenotes_adapter_axum::{DevServer, DevServerConfig};
use log::LevelFilter;

fn main() {
    if let Err(err) = run() {
        eprintln!("edgenotes-adapter-axum failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .ok();

    let config = DevServerConfig::from_env()?;
    DevServer::new(config).run()
}
