use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::Config;
use crate::emit::Request;
use crate::resolve::{Defaults, Overrides};

/// Everything a run needs, built once from the command line and the config file.
#[derive(Debug, Clone)]
pub struct Ops {
    pub interface: String,
    pub server_config: PathBuf,
    pub template: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub request: Request,
    pub overrides: Overrides,
    pub defaults: Defaults,
    pub append_to_server: bool,
    pub qr: bool,
    pub json: bool,
}

impl Ops {
    pub fn new(cli: Cli, config: Config) -> Self {
        let def_interface = "wg0".to_string();
        let def_output_dir = PathBuf::from(".");
        let def_client_prefix = "client".to_string();

        // an explicit server file names the interface unless one is given
        let interface = cli
            .interface
            .clone()
            .or_else(|| interface_of(cli.server_config.as_deref()?))
            .or_else(|| config.interface.clone())
            .unwrap_or(def_interface);
        let server_config = cli
            .server_config
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/etc/wireguard/{}.conf", interface)));

        Self {
            interface,
            server_config,
            template: cli.template,
            output_dir: cli
                .output_dir
                .or_else(|| config.output_dir.clone())
                .unwrap_or(def_output_dir),
            request: Request {
                count: usize::from(cli.count),
                prefix: cli
                    .prefix
                    .or_else(|| config.client_prefix.clone())
                    .unwrap_or(def_client_prefix),
                preshared_keys: !cli.no_psk,
            },
            overrides: Overrides {
                endpoint: cli.endpoint,
                server_public_key: cli.server_public_key,
                address_block: cli.block,
                start_offset: cli.start,
                allowed_ips: cli.allowed_ips,
                mtu: cli.mtu,
                dns: cli.dns,
            },
            defaults: Defaults::from(config),
            append_to_server: !cli.no_append,
            qr: cli.qr,
            json: cli.json,
        }
    }
}

fn interface_of(path: &Path) -> Option<String> {
    path.file_stem().and_then(OsStr::to_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn ops(args: &[&str], config: Config) -> Ops {
        let cli = Cli::try_parse_from(std::iter::once("wg-peergen").chain(args.iter().copied())).unwrap();
        Ops::new(cli, config)
    }

    #[test]
    fn test_defaults() {
        let ops = ops(&[], Config::default());
        assert_eq!(ops.interface, "wg0");
        assert_eq!(ops.server_config, PathBuf::from("/etc/wireguard/wg0.conf"));
        assert_eq!(ops.output_dir, PathBuf::from("."));
        assert_eq!(ops.request.prefix, "client");
        assert_eq!(ops.request.count, 1);
        assert!(ops.request.preshared_keys);
        assert!(ops.append_to_server);
    }

    #[test]
    fn test_interface_from_server_config() {
        let ops = ops(&["--server-config", "/srv/vpn/office.conf"], Config::default());
        assert_eq!(ops.interface, "office");
        assert_eq!(ops.server_config, PathBuf::from("/srv/vpn/office.conf"));
    }

    #[test]
    fn test_cli_beats_config() {
        let config = Config {
            interface: Some("wg1".to_string()),
            client_prefix: Some("cfg".to_string()),
            output_dir: Some(PathBuf::from("/var/lib/peers")),
            ..Default::default()
        };
        let with_config = ops(&[], config.clone());
        assert_eq!(with_config.interface, "wg1");
        assert_eq!(with_config.server_config, PathBuf::from("/etc/wireguard/wg1.conf"));
        assert_eq!(with_config.request.prefix, "cfg");
        assert_eq!(with_config.output_dir, PathBuf::from("/var/lib/peers"));

        let with_cli = ops(&["-i", "wg2", "-p", "emp", "-o", "out"], config);
        assert_eq!(with_cli.interface, "wg2");
        assert_eq!(with_cli.request.prefix, "emp");
        assert_eq!(with_cli.output_dir, PathBuf::from("out"));
    }
}
