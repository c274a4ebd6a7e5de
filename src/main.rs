use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use siprelay::cli;
use siprelay::config::{self, Config};
use siprelay::diary::CallDiary;
use siprelay::logging;
use siprelay::sip::{Proxy, ProxyIdentity, ProxyServer, Registrar};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();
    if args.help {
        cli::print_help();
        return Ok(());
    }

    if !cli::confirm_start()? {
        return Ok(());
    }
    println!("SIP proxy is running.");

    let config = Config::from_env()?;
    logging::init(&config.proxy_log)?;
    info!("{}", chrono::Local::now().format("%a, %d %b %Y %H:%M:%S"));

    let ip = config::advertised_ip(args.fallback_ip.as_deref())?;
    info!("{}", ip);
    println!("Address of SIP proxy: {}", ip);

    let server = ProxyServer::bind(&format!("0.0.0.0:{}", config.sip_port)).await?;
    let identity = ProxyIdentity::new(ip, config.sip_port);
    let proxy = Arc::new(Proxy::new(
        Registrar::new(),
        identity,
        CallDiary::new(&config.call_diary),
    ));

    let cancel = CancellationToken::new();
    let listener = {
        let cancel = cancel.clone();
        tokio::spawn(async move { server.run(proxy, cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    tokio::task::spawn_blocking(cli::wait_for_stop).await??;

    println!("Shutdown of SIP proxy");
    cancel.cancel();
    listener.await?;
    Ok(())
}
