use clap::Parser;
use std::path::PathBuf;

use crate::address_block::AddressBlock;

/// WireGuard peer generator - create client configurations from an existing server
/// and merge them back into it
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    /// Server endpoint clients connect to, host:port [default: detected local address]
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Server public key [default: derived from the server PrivateKey]
    #[arg(short = 'k', long = "server-pubkey")]
    pub server_public_key: Option<String>,

    /// Number of peers to generate
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=254))]
    pub count: u8,

    /// Client address block A.B.C [default: from the server Address]
    #[arg(short, long)]
    pub block: Option<AddressBlock>,

    /// First address offset to assign [default: one above the highest existing peer]
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=254))]
    pub start: Option<u8>,

    /// Routing policy written to client AllowedIPs, passed through verbatim.
    /// Full tunnel: "0.0.0.0/0, ::/0". Private ranges only:
    /// "10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16". Or an explicit subnet.
    #[arg(short, long)]
    pub allowed_ips: Option<String>,

    /// Client MTU [default: template or server MTU, else omitted]
    #[arg(short, long)]
    pub mtu: Option<u16>,

    /// Client DNS servers, empty to omit [default: 1.1.1.1]
    #[arg(short, long)]
    pub dns: Option<String>,

    /// Server WireGuard interface name [default: wg0]
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Server configuration file [default: /etc/wireguard/<interface>.conf]
    #[arg(long)]
    pub server_config: Option<PathBuf>,

    /// Directory for generated files [default: .]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Client name prefix, files are named <prefix><n>.conf [default: client]
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Previously generated client file to take endpoint, MTU, DNS and AllowedIPs from
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Do not generate pre-shared keys
    #[arg(long)]
    pub no_psk: bool,

    /// Do not append new peers to the server configuration or reload it
    #[arg(long)]
    pub no_append: bool,

    /// Print a QR code for every generated client configuration
    #[arg(long)]
    pub qr: bool,

    /// Format output as json
    #[arg(long)]
    pub json: bool,

    /// Specify config file to use
    #[arg(
        short,
        long,
        env = "WG_PEERGEN_CONFIG_FILE",
        default_value = "/etc/wg-peergen/config.toml"
    )]
    pub config_file: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}
