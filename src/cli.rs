//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::storage::Role;

/// LearnHub - courses, enrollments, payments and verifiable certificates
#[derive(Parser)]
#[command(name = "learnhub")]
#[command(version)]
#[command(about = "Learning-management backend", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, short = 'c', global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands (no command = start the HTTP server)
#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Verify or revoke certificates
    Certificate {
        #[command(subcommand)]
        action: CertificateCommands,
    },

    /// Recompute all progress and issue missing certificates
    Reconcile,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite without asking
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create an admin account
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "Administrator")]
        name: String,

        /// Password (if not provided, will prompt interactively)
        #[arg(long)]
        password: Option<String>,

        /// Read password from stdin (for scripting)
        #[arg(long)]
        stdin: bool,
    },

    /// Change a user's role
    SetRole {
        email: String,

        /// student | instructor | admin
        role: Role,
    },
}

#[derive(Subcommand)]
pub enum CertificateCommands {
    /// Print the public verification record
    Verify { id: String },

    /// Revoke a certificate
    Revoke {
        id: String,

        #[arg(long)]
        reason: String,
    },
}
