use anyhow::Context;
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::emit::Summary;
use crate::ops::Ops;
use crate::wg::keys::Wg;

mod address_block;
mod cli;
mod config;
mod emit;
mod local_addr;
mod merge;
mod ops;
mod qr;
mod resolve;
mod wg;

fn main() -> ExitCode {
    let args = cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: cli::Cli) -> anyhow::Result<()> {
    let config = config::load(&args.config_file)
        .with_context(|| format!("loading configuration from {:?}", args.config_file))?;
    let ops = Ops::new(args, config);

    let server_text = fs::read_to_string(&ops.server_config)
        .with_context(|| format!("reading server configuration {:?}", ops.server_config))?;
    let template_text = ops
        .template
        .as_ref()
        .map(|path| fs::read_to_string(path).with_context(|| format!("reading template {:?}", path)))
        .transpose()?;

    let wg = Wg::default();
    let params = resolve::resolve(
        &server_text,
        template_text.as_deref(),
        &ops.overrides,
        &ops.defaults,
        &wg,
        local_addr::detect,
    )?;

    let peers = emit::generate(&params, &ops.request, &wg)?;
    let written = emit::write(&ops.output_dir, &ops.interface, &params, &peers)?;

    if ops.qr {
        for file in &written.client_files {
            match qr::render(file) {
                Ok(code) => println!("{}\n{}", file.display(), code),
                Err(err) => tracing::warn!(%err, ?file, "rendering QR code failed"),
            }
        }
    }

    let outcome = if ops.append_to_server {
        let strategies = wg::quick::strategies(&ops.interface, ops.server_config.clone());
        Some(merge::run(
            &ops.server_config,
            &written.server_peers_file,
            &ops.interface,
            &strategies,
        ))
    } else {
        tracing::info!(file = ?written.server_peers_file, "server configuration left untouched");
        None
    };

    let summary = Summary::new(&peers, &written, outcome);
    if ops.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for peer in &summary.peers {
            println!("{}\t{}\t{}", peer.name, peer.address, peer.file.display());
        }
        println!("server peers: {}", summary.server_peers_file.display());
    }

    Ok(())
}
