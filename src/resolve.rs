use std::net::IpAddr;

use crate::address_block::{AddressBlock, Offsets};
use crate::config::Config;
use crate::wg::conf::{ServerSettings, TemplateSettings};
use crate::wg::keys::{self, KeyTool};

/// Values given explicitly on the command line. They beat every other source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub server_public_key: Option<String>,
    pub address_block: Option<AddressBlock>,
    pub start_offset: Option<u8>,
    pub allowed_ips: Option<String>,
    pub mtu: Option<u16>,
    pub dns: Option<String>,
}

/// Last resort values for anything not overridden, templated or detected.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub address_block: AddressBlock,
    pub listen_port: u16,
    pub mtu: Option<u16>,
    pub dns: Option<String>,
    pub allowed_ips: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults::from(Config::default())
    }
}

impl From<Config> for Defaults {
    fn from(config: Config) -> Self {
        let def_address_block = AddressBlock::new(10, 0, 0);
        let def_listen_port = 51820;
        let def_dns = "1.1.1.1".to_string();
        let def_allowed_ips = "0.0.0.0/0, ::/0".to_string();

        Self {
            address_block: config.fallback_address_block.unwrap_or(def_address_block),
            listen_port: config.listen_port.unwrap_or(def_listen_port),
            mtu: config.mtu,
            dns: Some(config.dns.unwrap_or(def_dns)).filter(|dns| !dns.is_empty()),
            allowed_ips: config.allowed_ips.unwrap_or(def_allowed_ips),
        }
    }
}

/// Fully resolved input for peer generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub server_public_key: String,
    pub endpoint: String,
    pub address_block: AddressBlock,
    // only set when the server itself lives inside `address_block`
    pub server_offset: Option<u8>,
    pub start_offset: u16,
    pub allowed_ips: String,
    pub mtu: Option<u16>,
    pub dns: Option<String>,
}

impl GenerationParams {
    pub fn offsets(&self) -> Offsets {
        Offsets::new(self.start_offset, self.server_offset)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to resolve {field}: {hint}")]
    MissingField { field: &'static str, hint: &'static str },
    #[error("deriving the server public key from its PrivateKey failed")]
    KeyDerivation(#[source] keys::Error),
}

/// Merge overrides, template, server configuration and defaults into
/// [`GenerationParams`].
///
/// `local_ip` is only consulted when no endpoint was given or templated.
pub fn resolve<F>(
    server_text: &str,
    template_text: Option<&str>,
    overrides: &Overrides,
    defaults: &Defaults,
    keys: &dyn KeyTool,
    local_ip: F,
) -> Result<GenerationParams, Error>
where
    F: FnOnce() -> Option<IpAddr>,
{
    let server = ServerSettings::scan(server_text);
    let template = template_text.map(TemplateSettings::scan).unwrap_or_default();

    let server_public_key = match (&overrides.server_public_key, &server.private_key) {
        (Some(public_key), _) => public_key.clone(),
        (None, Some(private_key)) => keys.pubkey(private_key).map_err(Error::KeyDerivation)?,
        (None, None) => {
            return Err(Error::MissingField {
                field: "server public key",
                hint: "no PrivateKey in the server configuration, pass --server-pubkey",
            })
        }
    };

    let endpoint = match overrides.endpoint.clone().or(template.endpoint.clone()) {
        Some(endpoint) => endpoint,
        None => {
            let port = server.listen_port.unwrap_or_else(|| {
                tracing::warn!(default = defaults.listen_port, "no ListenPort in server configuration");
                defaults.listen_port
            });
            match local_ip() {
                Some(ip) => format_endpoint(ip, port),
                None => {
                    return Err(Error::MissingField {
                        field: "server endpoint",
                        hint: "no local address could be detected, pass --endpoint",
                    })
                }
            }
        }
    };

    let address_block = match overrides.address_block.or(server.address_block) {
        Some(block) => block,
        None => {
            tracing::warn!(
                default = %defaults.address_block,
                "no usable Address in server configuration, using fallback block"
            );
            defaults.address_block
        }
    };

    let server_offset = match server.address_block {
        Some(block) if block != address_block => None,
        Some(_) => Some(server.server_offset.unwrap_or_else(|| {
            tracing::warn!("server Address has no usable host octet, assuming .1");
            1
        })),
        None => Some(1),
    };

    let start_offset = match overrides.start_offset {
        Some(start) => u16::from(start),
        None => next_free_offset(&server, &address_block, server_offset),
    };

    let allowed_ips = overrides
        .allowed_ips
        .clone()
        .or(template.allowed_ips.clone())
        .unwrap_or_else(|| defaults.allowed_ips.clone());

    let mtu = overrides.mtu.or(template.mtu).or(server.mtu).or(defaults.mtu);
    let dns = overrides
        .dns
        .clone()
        .or(template.dns.clone())
        .or(defaults.dns.clone())
        .filter(|dns| !dns.is_empty());

    let params = GenerationParams {
        server_public_key,
        endpoint,
        address_block,
        server_offset,
        start_offset,
        allowed_ips,
        mtu,
        dns,
    };
    tracing::debug!(?params, "resolved generation parameters");
    Ok(params)
}

/// One above the highest claimed offset in `block`, or 2 when nothing is claimed.
/// Lands one further when that collides with the server.
fn next_free_offset(server: &ServerSettings, block: &AddressBlock, server_offset: Option<u8>) -> u16 {
    let start = server
        .claimed_offsets(block)
        .max()
        .map(|max| u16::from(max) + 1)
        .unwrap_or(2);

    if server_offset.map(u16::from) == Some(start) {
        start + 1
    } else {
        start
    }
}

fn format_endpoint(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(ip) => format!("{}:{}", ip, port),
        IpAddr::V6(ip) => format!("[{}]:{}", ip, port),
    }
}
