use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Generic(String),
    #[error("{0}")]
    IO(String),
}

/// One way of making a running interface pick up configuration changes.
pub trait Reload {
    fn describe(&self) -> String;
    fn reload(&self) -> Result<(), Error>;
}

/// `wg-quick strip <config> | wg syncconf <interface> /dev/stdin`, keeps the tunnel up.
#[derive(Debug, Clone)]
pub struct SyncConf {
    pub interface: String,
    pub config: PathBuf,
    pub wg_quick: PathBuf,
    pub wg: PathBuf,
}

/// `systemctl restart wg-quick@<interface>`.
#[derive(Debug, Clone)]
pub struct ServiceRestart {
    pub interface: String,
}

/// Reload strategies in the order they should be tried.
pub fn strategies(interface: &str, config: PathBuf) -> Vec<Box<dyn Reload>> {
    vec![
        Box::new(SyncConf {
            interface: interface.to_string(),
            config,
            wg_quick: PathBuf::from("wg-quick"),
            wg: PathBuf::from("wg"),
        }),
        Box::new(ServiceRestart {
            interface: interface.to_string(),
        }),
    ]
}

impl Reload for SyncConf {
    fn describe(&self) -> String {
        format!("wg syncconf {}", self.interface)
    }

    fn reload(&self) -> Result<(), Error> {
        let config = self.config.clone();
        let output_strip = Command::new(&self.wg_quick)
            .arg("strip")
            .arg(config.clone())
            .output()
            .map_err(|err| Error::IO(format!("wg-quick strip {:?} failed: {:?}", config, err)))?;

        if !output_strip.stderr.is_empty() {
            tracing::warn!(
                stderr = String::from_utf8_lossy(&output_strip.stderr).to_string(),
                ?config,
                "wg-quick strip"
            );
        }

        if !output_strip.status.success() {
            return Err(Error::Generic(format!("wg-quick strip failed: {}", output_strip.status)));
        }

        let mut child = Command::new(&self.wg)
            .arg("syncconf")
            .arg(&self.interface)
            .arg("/dev/stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| Error::IO(format!("wg syncconf {} failed: {:?}", self.interface, err)))?;

        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(&output_strip.stdout)
                .map_err(|err| Error::IO(format!("writing to wg syncconf failed: {:?}", err)))?;
        }

        let output_sync = child
            .wait_with_output()
            .map_err(|err| Error::IO(format!("wg syncconf {} failed: {:?}", self.interface, err)))?;

        if !output_sync.stderr.is_empty() {
            tracing::warn!(
                stderr = String::from_utf8_lossy(&output_sync.stderr).to_string(),
                interface = self.interface,
                "wg syncconf"
            );
        }

        if !output_sync.status.success() {
            return Err(Error::Generic(format!("wg syncconf failed: {}", output_sync.status)));
        }

        Ok(())
    }
}

impl ServiceRestart {
    fn unit(&self) -> String {
        format!("wg-quick@{}", self.interface)
    }
}

impl Reload for ServiceRestart {
    fn describe(&self) -> String {
        format!("systemctl restart {}", self.unit())
    }

    fn reload(&self) -> Result<(), Error> {
        let unit = self.unit();
        let output = Command::new("systemctl")
            .arg("restart")
            .arg(&unit)
            .output()
            .map_err(|err| Error::IO(format!("systemctl restart {} failed: {:?}", unit, err)))?;

        if !output.stderr.is_empty() {
            tracing::warn!(
                stderr = String::from_utf8_lossy(&output.stderr).to_string(),
                unit,
                "systemctl restart"
            );
        }

        if !output.status.success() {
            return Err(Error::Generic(format!("systemctl restart failed: {}", output.status)));
        }

        Ok(())
    }
}
