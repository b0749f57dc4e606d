//! Tool server targets and local launch commands.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ChatError;

/// Where a tool server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTarget {
    /// A script launched as a child process, spoken to over stdio.
    Local(PathBuf),
    /// An HTTP(S) endpoint with a server-push stream.
    Remote(String),
}

impl ServerTarget {
    /// `http://` and `https://` strings are remote; anything else is a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else {
            Self::Local(PathBuf::from(trimmed))
        }
    }
}

impl FromStr for ServerTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Program and arguments used to run a local server script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Pick the runtime for a script from its extension.
    pub fn for_script(path: &Path) -> Result<Self, ChatError> {
        let script = path.to_string_lossy().into_owned();
        let extension = path.extension().and_then(|ext| ext.to_str());

        let (program, mut args) = match extension {
            Some("js") => ("node", Vec::new()),
            Some("py") => (python_interpreter(), Vec::new()),
            Some("jar") => ("java", vec!["-jar".to_string()]),
            _ => return Err(ChatError::UnsupportedScriptKind { path: script }),
        };
        args.push(script);

        Ok(Self {
            program: program.to_string(),
            args,
        })
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn python_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}
