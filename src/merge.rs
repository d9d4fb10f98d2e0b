use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::wg::quick::Reload;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    IO(String),
}

/// What happened to the live server after the peers were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Reloaded { method: String },
    ManualRestartRequired { command: String },
    AppendFailed { command: String },
}

/// Append the peer stanzas to the server configuration, then reload.
///
/// Failures are reported in the returned [`Outcome`], the peer files already exist.
pub fn run(server_config: &Path, peers_file: &Path, interface: &str, strategies: &[Box<dyn Reload>]) -> Outcome {
    if let Err(err) = append(server_config, peers_file) {
        let command = format!("cat {} >> {}", peers_file.display(), server_config.display());
        tracing::warn!(%err, command, "appending peers to server configuration failed, append manually");
        return Outcome::AppendFailed { command };
    }
    tracing::info!(?server_config, "appended new peers to server configuration");
    reload(interface, server_config, strategies)
}

pub fn append(server_config: &Path, peers_file: &Path) -> Result<(), Error> {
    let stanzas =
        fs::read_to_string(peers_file).map_err(|err| Error::IO(format!("reading {:?} failed: {:?}", peers_file, err)))?;

    let mut file = OpenOptions::new()
        .append(true)
        .open(server_config)
        .map_err(|err| Error::IO(format!("opening {:?} failed: {:?}", server_config, err)))?;

    file.write_all(format!("\n{}", stanzas).as_bytes())
        .map_err(|err| Error::IO(format!("appending to {:?} failed: {:?}", server_config, err)))
}

/// Try each strategy in order until one succeeds.
pub fn reload(interface: &str, server_config: &Path, strategies: &[Box<dyn Reload>]) -> Outcome {
    for strategy in strategies {
        let method = strategy.describe();
        match strategy.reload() {
            Ok(()) => {
                tracing::info!(method, "reloaded wireguard interface");
                return Outcome::Reloaded { method };
            }
            Err(err) => {
                tracing::warn!(%err, method, "reload failed");
            }
        }
    }

    let command = manual_restart(interface, server_config);
    tracing::warn!(command, "could not reload {}, restart it manually", interface);
    Outcome::ManualRestartRequired { command }
}

/// wg-quick only resolves a bare interface name to /etc/wireguard/<interface>.conf.
fn manual_restart(interface: &str, server_config: &Path) -> String {
    let default_config = PathBuf::from(format!("/etc/wireguard/{}.conf", interface));
    let target = if server_config == default_config.as_path() {
        interface.to_string()
    } else {
        server_config.display().to_string()
    };
    format!("wg-quick down {0} && wg-quick up {0}", target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wg::quick;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Scripted {
        name: &'static str,
        ok: bool,
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Reload for Scripted {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        fn reload(&self) -> Result<(), quick::Error> {
            self.calls.borrow_mut().push(self.name);
            if self.ok {
                Ok(())
            } else {
                Err(quick::Error::Generic(format!("{} failed", self.name)))
            }
        }
    }

    fn chain(results: &[(&'static str, bool)]) -> (Vec<Box<dyn Reload>>, Rc<RefCell<Vec<&'static str>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let strategies = results
            .iter()
            .map(|&(name, ok)| {
                Box::new(Scripted {
                    name,
                    ok,
                    calls: calls.clone(),
                }) as Box<dyn Reload>
            })
            .collect();
        (strategies, calls)
    }

    #[test]
    fn test_reload_stops_at_first_success() {
        let (strategies, calls) = chain(&[("sync", true), ("restart", true)]);
        let outcome = reload("wg0", Path::new("/etc/wireguard/wg0.conf"), &strategies);
        assert_eq!(
            outcome,
            Outcome::Reloaded {
                method: "sync".to_string()
            }
        );
        assert_eq!(*calls.borrow(), vec!["sync"]);
    }

    #[test]
    fn test_reload_falls_back() {
        let (strategies, calls) = chain(&[("sync", false), ("restart", true)]);
        let outcome = reload("wg0", Path::new("/etc/wireguard/wg0.conf"), &strategies);
        assert_eq!(
            outcome,
            Outcome::Reloaded {
                method: "restart".to_string()
            }
        );
        assert_eq!(*calls.borrow(), vec!["sync", "restart"]);
    }

    #[test]
    fn test_reload_all_fail() {
        let (strategies, _) = chain(&[("sync", false), ("restart", false)]);
        let outcome = reload("wg0", Path::new("/etc/wireguard/wg0.conf"), &strategies);
        assert_eq!(
            outcome,
            Outcome::ManualRestartRequired {
                command: "wg-quick down wg0 && wg-quick up wg0".to_string()
            }
        );
    }

    #[test]
    fn test_manual_restart_names_custom_config() {
        let (strategies, _) = chain(&[("sync", false)]);
        let outcome = reload("office", Path::new("/srv/vpn/office.conf"), &strategies);
        assert_eq!(
            outcome,
            Outcome::ManualRestartRequired {
                command: "wg-quick down /srv/vpn/office.conf && wg-quick up /srv/vpn/office.conf".to_string()
            }
        );
    }

    #[test]
    fn test_append_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let server_config = dir.path().join("wg0.conf");
        let peers_file = dir.path().join("wg0-peers.conf");
        fs::write(&server_config, "[Interface]\nAddress = 10.0.5.1/24\n").unwrap();
        fs::write(&peers_file, "# emp1\n[Peer]\nPublicKey = k\nAllowedIPs = 10.0.5.2/32\n\n").unwrap();

        let (strategies, _) = chain(&[("sync", true)]);
        let outcome = run(&server_config, &peers_file, "wg0", &strategies);
        assert!(matches!(outcome, Outcome::Reloaded { .. }));
        assert_eq!(
            fs::read_to_string(&server_config).unwrap(),
            "[Interface]\nAddress = 10.0.5.1/24\n\n# emp1\n[Peer]\nPublicKey = k\nAllowedIPs = 10.0.5.2/32\n\n"
        );
    }

    #[test]
    fn test_append_failure_skips_reload() {
        let dir = tempfile::tempdir().unwrap();
        let peers_file = dir.path().join("wg0-peers.conf");
        fs::write(&peers_file, "[Peer]\n").unwrap();

        let (strategies, calls) = chain(&[("sync", true)]);
        let outcome = run(&dir.path().join("missing.conf"), &peers_file, "wg0", &strategies);
        assert!(matches!(outcome, Outcome::AppendFailed { .. }));
        assert!(calls.borrow().is_empty());
    }
}
