use clap::{Parser, Subcommand};

/// Publink: social platform connection manager
#[derive(Parser)]
#[command(name = "publink", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to PUBLINK_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep everything in process memory instead of Postgres/Redis
        #[arg(long)]
        memory: bool,
    },

    /// Show connection status for every platform
    Status,

    /// Manage stored connections
    Connections {
        #[command(subcommand)]
        command: ConnectionCommands,
    },
}

#[derive(Subcommand)]
pub enum ConnectionCommands {
    /// List stored connections (credentials are never printed)
    List,
    /// Remove a platform's connection and anything derived from it
    Disconnect {
        #[arg(long)]
        platform: String,
    },
    /// Renew the YouTube access token from its refresh token
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["publink", "serve"]).unwrap();
        match cli.command {
            Some(Commands::Serve { port, memory }) => {
                assert_eq!(port, None);
                assert!(!memory);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_disconnect_requires_platform() {
        assert!(Cli::try_parse_from(["publink", "connections", "disconnect"]).is_err());
        let cli =
            Cli::try_parse_from(["publink", "connections", "disconnect", "--platform", "meta"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Connections {
                command: ConnectionCommands::Disconnect { .. }
            })
        ));
    }
}
