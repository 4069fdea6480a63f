use std::ffi::OsStr;
use std::fmt;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use colored::Colorize;

/// Program name and arguments for one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Executes external commands.
///
/// Implemented by [`SystemRunner`] for real processes.
pub trait CommandRunner {
    /// Run the command with inherited stdout and return its exit code.
    ///
    /// # Errors
    /// Returns an error if the program can not be started.
    fn run(&self, command: &ExternalCommand) -> Result<i32>;

    /// Run the command and collect its trimmed stdout lines. Stderr is discarded.
    ///
    /// # Errors
    /// Returns an error if the program can not be started.
    fn lines(&self, command: &ExternalCommand) -> Result<Vec<String>>;
}

/// Runs commands as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner {
    /// Discard stderr of `run` calls.
    pub quiet_stderr: bool,
}

impl ExternalCommand {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add arguments only when `condition` is true.
    #[must_use]
    pub fn args_if<I, S>(self, condition: bool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if condition { self.args(args) } else { self }
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args.iter().map(OsStr::new));
        command
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

impl SystemRunner {
    #[must_use]
    pub const fn quiet() -> Self {
        Self { quiet_stderr: true }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand) -> Result<i32> {
        println!("{} {command}", "▶".bold());
        let mut process = command.to_command();
        if self.quiet_stderr {
            process.stderr(Stdio::null());
        }
        let status = process
            .status()
            .with_context(|| format!("Failed to execute {}. Make sure it is installed and in PATH", command.program))?;
        // Killed by a signal
        Ok(status.code().unwrap_or(1))
    }

    fn lines(&self, command: &ExternalCommand) -> Result<Vec<String>> {
        let output = command
            .to_command()
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}. Make sure it is installed and in PATH", command.program))?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

/// Quote a single argument for display in a POSIX shell.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let is_safe = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-' | '_'));
    if is_safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
