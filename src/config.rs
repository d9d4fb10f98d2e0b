use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::address_block::AddressBlock;

/// Site defaults, read from an optional TOML file and `WG_PEERGEN_*` variables.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct Config {
    // used when the server configuration has no usable Address line
    pub fallback_address_block: Option<AddressBlock>,
    // port for the auto-detected endpoint when the server has no ListenPort
    pub listen_port: Option<u16>,
    pub mtu: Option<u16>,
    pub dns: Option<String>,
    pub allowed_ips: Option<String>,
    // wg interface name, also names /etc/wireguard/<interface>.conf
    pub interface: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub client_prefix: Option<String>,
}

/// A missing file is not an error, values then come from the environment or defaults.
pub fn load(path: &Path) -> Result<Config, figment::Error> {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("WG_PEERGEN_"))
        .extract()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = load(&dir.path().join("absent.toml"));
        assert!(res.is_ok());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"fallback_address_block = "10.9.8"
            mtu = 1380
            dns = "9.9.9.9"
            client_prefix = "emp""#,
        )
        .unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.fallback_address_block, Some(AddressBlock::new(10, 9, 8)));
        assert_eq!(config.mtu, Some(1380));
        assert_eq!(config.dns.as_deref(), Some("9.9.9.9"));
        assert_eq!(config.client_prefix.as_deref(), Some("emp"));
        assert!(config.listen_port.is_none());
    }

    #[test]
    fn test_load_rejects_bad_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, r#"fallback_address_block = "10.9""#).unwrap();
        assert!(load(&path).is_err());
    }
}
