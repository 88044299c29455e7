use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run the `fleetload` binary and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_fleetload<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = fleetload_bin()?;
    Command::new(bin)
        .args(args)
        .env("FLEETLOAD_LOG", "error")
        .output()
        .map_err(|err| format!("run fleetload failed: {}", err))
}

/// Write `contents` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_config(path: &Path, contents: &str) -> Result<(), String> {
    fs::write(path, contents).map_err(|err| format!("write config failed: {}", err))
}

/// Format the process output for an assertion message.
#[must_use]
pub fn describe(output: &Output) -> String {
    format!(
        "status: {}\nstdout: {}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn fleetload_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_fleetload").map_or_else(
        || Err("CARGO_BIN_EXE_fleetload missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
