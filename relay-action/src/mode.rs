//! Invocation mode

use std::fmt;
use std::str::FromStr;

/// Whether an action binary should do its work
///
/// Tooling that only wants to inspect a package invokes its binaries with
/// `--declare`; every entry point then returns immediately without reading
/// the environment or running the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Declare,
    #[default]
    Run,
}

impl Mode {
    /// Reads the mode from the process arguments
    pub fn from_args() -> Self {
        Self::from_arg_list(std::env::args().skip(1))
    }

    /// `Declare` if `--declare` appears anywhere in `args`
    pub fn from_arg_list<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if args.into_iter().any(|arg| arg.as_ref() == "--declare") {
            Mode::Declare
        } else {
            Mode::Run
        }
    }

    pub fn is_declare(self) -> bool {
        self == Mode::Declare
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declare" => Ok(Mode::Declare),
            "run" => Ok(Mode::Run),
            other => Err(format!("unknown mode '{}', expected 'declare' or 'run'", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Declare => f.write_str("declare"),
            Mode::Run => f.write_str("run"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_args() {
        assert_eq!(Mode::from_arg_list(["--declare"]), Mode::Declare);
        assert_eq!(Mode::from_arg_list(["--verbose", "--declare"]), Mode::Declare);
        assert_eq!(Mode::from_arg_list(Vec::<String>::new()), Mode::Run);
        assert_eq!(Mode::from_arg_list(["declare"]), Mode::Run);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("declare".parse::<Mode>(), Ok(Mode::Declare));
        assert_eq!("run".parse::<Mode>(), Ok(Mode::Run));
        assert!("dry-run".parse::<Mode>().is_err());
        assert_eq!(Mode::default().to_string(), "run");
    }
}
