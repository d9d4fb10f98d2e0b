use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Generic(String),
    #[error("{0}")]
    IO(String),
    #[error("{0} returned an empty key")]
    EmptyKey(&'static str),
}

/// Source of WireGuard key material.
pub trait KeyTool {
    fn genkey(&self) -> Result<String, Error>;
    fn pubkey(&self, private_key: &str) -> Result<String, Error>;
    fn genpsk(&self) -> Result<String, Error>;
}

/// Key material from the `wg` command line tool.
#[derive(Debug, Clone)]
pub struct Wg {
    program: PathBuf,
}

impl Wg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Wg {
    fn default() -> Self {
        Wg::new("wg")
    }
}

impl KeyTool for Wg {
    fn genkey(&self) -> Result<String, Error> {
        self.run("genkey", None)
    }

    fn pubkey(&self, private_key: &str) -> Result<String, Error> {
        self.run("pubkey", Some(private_key))
    }

    fn genpsk(&self) -> Result<String, Error> {
        self.run("genpsk", None)
    }
}

impl Wg {
    fn run(&self, subcommand: &'static str, stdin: Option<&str>) -> Result<String, Error> {
        run(&self.program, subcommand, stdin)
    }
}

fn run(program: &Path, subcommand: &'static str, stdin: Option<&str>) -> Result<String, Error> {
    let mut child = Command::new(program)
        .arg(subcommand)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| Error::IO(format!("wg {} failed: {:?}", subcommand, err)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(format!("{}\n", input).as_bytes())
            .map_err(|err| Error::IO(format!("writing to wg {} failed: {:?}", subcommand, err)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|err| Error::IO(format!("wg {} failed: {:?}", subcommand, err)))?;

    if !output.stderr.is_empty() {
        tracing::warn!(
            stderr = String::from_utf8_lossy(&output.stderr).to_string(),
            subcommand,
            "wg"
        );
    }

    if !output.status.success() {
        return Err(Error::Generic(format!("wg {} failed: {}", subcommand, output.status)));
    }

    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if key.is_empty() {
        return Err(Error::EmptyKey(subcommand));
    }
    Ok(key)
}
