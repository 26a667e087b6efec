//! Command line arguments.

use clap::Parser;

/// Take one portrait a day and turn the collection into a timelapse
#[derive(Parser, Debug, Default)]
#[command(name = "daily-portrait")]
#[command(version, about)]
pub struct Cli {
    /// Verbose diagnostic output to standard output
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_debug_flag() {
        let cli = Cli::try_parse_from(["daily-portrait", "--debug"]).unwrap();
        assert!(cli.debug);

        let cli = Cli::try_parse_from(["daily-portrait"]).unwrap();
        assert!(!cli.debug);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["daily-portrait", "--verbose"]).is_err());
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }
}
