use anyhow::Context;
use ccenter_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let port = port.unwrap_or(config.server.port);

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!("Command Center → http://localhost:{actual_port}");

        tokio::select! {
            res = ccenter_server::serve_on(root_buf, config, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
