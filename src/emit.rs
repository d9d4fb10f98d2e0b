use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::address_block::AddressBlock;
use crate::merge;
use crate::resolve::GenerationParams;
use crate::wg::keys::{self, KeyTool};

pub const PERSISTENT_KEEPALIVE: u16 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub name: String,
    pub private_key: String,
    pub public_key: String,
    pub preshared_key: Option<String>,
    pub address: Ipv4Addr,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("address block {block} has no room for {requested} peers starting at .{start}")]
    BlockExhausted {
        block: AddressBlock,
        requested: usize,
        start: u16,
    },
    #[error("generating keys for {name} failed")]
    Keys {
        name: String,
        #[source]
        source: keys::Error,
    },
    #[error("{0}")]
    IO(String),
}

/// Which peers to create.
#[derive(Debug, Clone)]
pub struct Request {
    pub count: usize,
    pub prefix: String,
    pub preshared_keys: bool,
}

/// Files produced by [`write`].
#[derive(Debug, Clone)]
pub struct Written {
    pub client_files: Vec<PathBuf>,
    pub server_peers_file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct PeerSummary {
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub file: PathBuf,
}

/// Run report, printed as JSON with `--json`.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub peers: Vec<PeerSummary>,
    pub server_peers_file: PathBuf,
    pub merge: Option<merge::Outcome>,
}

impl Summary {
    pub fn new(peers: &[PeerRecord], written: &Written, merge: Option<merge::Outcome>) -> Self {
        Self {
            peers: peers
                .iter()
                .zip(written.client_files.iter())
                .map(|(peer, file)| PeerSummary {
                    name: peer.name.clone(),
                    address: format!("{}/24", peer.address),
                    public_key: peer.public_key.clone(),
                    file: file.clone(),
                })
                .collect(),
            server_peers_file: written.server_peers_file.clone(),
            merge,
        }
    }
}

/// Create key material and addresses for every requested peer.
///
/// Nothing is written here, a key failure leaves no partial output behind.
pub fn generate(params: &GenerationParams, request: &Request, keys: &dyn KeyTool) -> Result<Vec<PeerRecord>, Error> {
    let offsets: Vec<u8> = params.offsets().take(request.count).collect();
    if offsets.len() < request.count {
        return Err(Error::BlockExhausted {
            block: params.address_block,
            requested: request.count,
            start: params.start_offset,
        });
    }

    offsets
        .into_iter()
        .enumerate()
        .map(|(idx, offset)| {
            let name = format!("{}{}", request.prefix, idx + 1);
            let (private_key, public_key, preshared_key) = peer_keys(keys, request.preshared_keys)
                .map_err(|source| Error::Keys {
                    name: name.clone(),
                    source,
                })?;

            Ok(PeerRecord {
                name,
                private_key,
                public_key,
                preshared_key,
                address: params.address_block.address(offset),
            })
        })
        .collect()
}

fn peer_keys(keys: &dyn KeyTool, with_psk: bool) -> Result<(String, String, Option<String>), keys::Error> {
    let private_key = keys.genkey()?;
    let public_key = keys.pubkey(&private_key)?;
    let preshared_key = if with_psk { Some(keys.genpsk()?) } else { None };
    Ok((private_key, public_key, preshared_key))
}

pub fn client_config(params: &GenerationParams, peer: &PeerRecord) -> String {
    let mut out = String::new();
    out.push_str("[Interface]\n");
    out.push_str(&format!("PrivateKey = {}\n", peer.private_key));
    out.push_str(&format!("Address = {}/24\n", peer.address));
    if let Some(mtu) = params.mtu {
        out.push_str(&format!("MTU = {}\n", mtu));
    }
    if let Some(dns) = &params.dns {
        out.push_str(&format!("DNS = {}\n", dns));
    }
    out.push('\n');
    out.push_str("[Peer]\n");
    out.push_str(&format!("PublicKey = {}\n", params.server_public_key));
    if let Some(psk) = &peer.preshared_key {
        out.push_str(&format!("PresharedKey = {}\n", psk));
    }
    out.push_str(&format!("AllowedIPs = {}\n", params.allowed_ips));
    out.push_str(&format!("Endpoint = {}\n", params.endpoint));
    out.push_str(&format!("PersistentKeepalive = {}\n", PERSISTENT_KEEPALIVE));
    out
}

pub fn server_stanza(peer: &PeerRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", peer.name));
    out.push_str("[Peer]\n");
    out.push_str(&format!("PublicKey = {}\n", peer.public_key));
    if let Some(psk) = &peer.preshared_key {
        out.push_str(&format!("PresharedKey = {}\n", psk));
    }
    out.push_str(&format!("AllowedIPs = {}/32\n", peer.address));
    out.push('\n');
    out
}

pub fn server_peers_file(out_dir: &Path, interface: &str) -> PathBuf {
    out_dir.join(format!("{}-peers.conf", interface))
}

/// Write one client file per peer plus the aggregate of server stanzas.
pub fn write(out_dir: &Path, interface: &str, params: &GenerationParams, peers: &[PeerRecord]) -> Result<Written, Error> {
    fs::create_dir_all(out_dir).map_err(|err| Error::IO(format!("creating {:?} failed: {:?}", out_dir, err)))?;

    let mut client_files = Vec::with_capacity(peers.len());
    for peer in peers {
        let path = out_dir.join(format!("{}.conf", peer.name));
        write_secret(&path, &client_config(params, peer))?;
        tracing::info!(peer = %peer.name, address = %peer.address, file = ?path, "wrote client configuration");
        client_files.push(path);
    }

    let server_peers_file = server_peers_file(out_dir, interface);
    let stanzas: String = peers.iter().map(server_stanza).collect();
    write_secret(&server_peers_file, &stanzas)?;

    Ok(Written {
        client_files,
        server_peers_file,
    })
}

fn write_secret(path: &Path, contents: &str) -> Result<(), Error> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|err| Error::IO(format!("opening {:?} failed: {:?}", path, err)))?;
    // mode() only applies on creation, a rewritten file keeps its old permissions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|err| Error::IO(format!("restricting {:?} failed: {:?}", path, err)))?;
    }
    file.write_all(contents.as_bytes())
        .map_err(|err| Error::IO(format!("writing {:?} failed: {:?}", path, err)))
}
