//! Command: a helper program plus its configured arguments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An external helper invocation as declared in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
}

impl Command {
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
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_program_followed_by_args() {
        let cmd = Command::new("/usr/bin/relay").args(["-p", "3"]);
        assert_eq!(cmd.to_string(), "/usr/bin/relay -p 3");
    }

    #[test]
    fn should_display_bare_program_when_no_args() {
        assert_eq!(Command::new("probe").to_string(), "probe");
    }
}
