use std::path::Path;
use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Generic(String),
    #[error("{0}")]
    IO(String),
}

/// Terminal QR code of a client configuration, for scanning into the mobile app.
pub fn render(file: &Path) -> Result<String, Error> {
    let output = Command::new("qrencode")
        .arg("-t")
        .arg("ansiutf8")
        .arg("-r")
        .arg(file)
        .output()
        .map_err(|err| Error::IO(format!("qrencode {:?} failed: {:?}", file, err)))?;

    if !output.status.success() {
        return Err(Error::Generic(format!(
            "qrencode failed: {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
