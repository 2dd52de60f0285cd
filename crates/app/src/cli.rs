use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(long, default_value = "serve")]
    pub mode: Mode,
    /// Start serving without applying pending migrations.
    #[arg(long, default_value_t = false)]
    pub skip_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Serve,
    Migrate,
}

impl Mode {
    pub fn run_api(self) -> bool {
        matches!(self, Mode::Serve)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Mode};

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["comment-tree"]);
        assert_eq!(cli.mode, Mode::Serve);
        assert!(!cli.skip_migrations);
    }

    #[test]
    fn parses_migrate_mode() {
        let cli = Cli::parse_from(["comment-tree", "--mode", "migrate"]);
        assert!(!cli.mode.run_api());
    }
}
