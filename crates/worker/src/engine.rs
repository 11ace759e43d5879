//! How to invoke the external conversion engine.

use std::path::Path;

use pdfrelay_core::options::ConversionOptions;
use tokio::process::Command;

/// Default engine executable.
pub const DEFAULT_ENGINE_BIN: &str = "ocrmypdf";

/// Default leading arguments: debug verbosity, so the engine logs the
/// per-page lines progress is scraped from.
pub const DEFAULT_ENGINE_ARGS: &[&str] = &["-v", "1"];

/// Executable plus fixed leading arguments of the conversion engine.
///
/// The full command line is
/// `program <base_args> <client options> <input> <output>`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub program: String,
    pub base_args: Vec<String>,
}

impl EngineConfig {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// Build the command for one job. I/O wiring is left to the caller.
    pub fn command(&self, options: &ConversionOptions, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(options.args())
            .arg(input)
            .arg(output);
        cmd
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_ENGINE_BIN,
            DEFAULT_ENGINE_ARGS.iter().map(|s| s.to_string()).collect(),
        )
    }
}
