use crate::address_block::AddressBlock;

/// Every value for `key`, in file order.
///
/// A line matches when the text before its first `=`, trimmed, equals `key`
/// exactly. The value has all whitespace removed.
pub fn values<'a>(text: &'a str, key: &'a str) -> impl Iterator<Item = String> + 'a {
    text.lines().filter_map(move |line| {
        let (lhs, rhs) = line.split_once('=')?;
        if lhs.trim() != key {
            return None;
        }
        Some(rhs.chars().filter(|c| !c.is_whitespace()).collect())
    })
}

/// First value for `key`. Later duplicates are ignored.
pub fn value(text: &str, key: &str) -> Option<String> {
    values(text, key).next()
}

/// Settings scanned from the server's own configuration.
#[derive(Debug, Default, Clone)]
pub struct ServerSettings {
    pub private_key: Option<String>,
    pub address_block: Option<AddressBlock>,
    pub server_offset: Option<u8>,
    pub listen_port: Option<u16>,
    pub mtu: Option<u16>,
    pub allowed_ips: Vec<String>,
}

impl ServerSettings {
    pub fn scan(text: &str) -> Self {
        let address = value(text, "Address");
        let interface_address = address
            .as_deref()
            .and_then(|a| a.split(',').next())
            .map(str::to_string);

        let address_block = interface_address.as_deref().and_then(|a| a.parse().ok());
        let server_offset = interface_address
            .as_deref()
            .and_then(|a| a.split('/').next())
            .and_then(|host| host.split('.').nth(3))
            .and_then(|octet| octet.parse::<u8>().ok());

        Self {
            private_key: value(text, "PrivateKey").filter(|k| !k.is_empty()),
            address_block,
            server_offset,
            listen_port: value(text, "ListenPort").and_then(|p| p.parse().ok()),
            mtu: value(text, "MTU").and_then(|m| m.parse().ok()),
            allowed_ips: values(text, "AllowedIPs").collect(),
        }
    }

    /// Offsets inside `block` already claimed by `AllowedIPs` entries.
    pub fn claimed_offsets<'a>(&'a self, block: &'a AddressBlock) -> impl Iterator<Item = u8> + 'a {
        self.allowed_ips
            .iter()
            .filter_map(move |ips| ips.split(',').next().and_then(|first| block.offset_of(first)))
    }
}

/// Client-facing settings taken from a previously generated peer file.
#[derive(Debug, Default, Clone)]
pub struct TemplateSettings {
    pub endpoint: Option<String>,
    pub mtu: Option<u16>,
    pub dns: Option<String>,
    pub allowed_ips: Option<String>,
}

impl TemplateSettings {
    pub fn scan(text: &str) -> Self {
        let endpoint = value(text, "Endpoint");
        if let Some(ep) = endpoint.as_deref() {
            if !is_host_port(ep) {
                tracing::warn!(endpoint = ep, "ignoring unparsable Endpoint in template");
            }
        }

        Self {
            endpoint: endpoint.filter(|ep| is_host_port(ep)),
            mtu: value(text, "MTU").and_then(|m| m.parse().ok()),
            dns: value(text, "DNS").filter(|d| !d.is_empty()),
            allowed_ips: value(text, "AllowedIPs").filter(|a| !a.is_empty()),
        }
    }
}

fn is_host_port(endpoint: &str) -> bool {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
