//! CLI interface module
//!
//! 管理命令直接连接数据库执行，不经过 HTTP 服务。

pub mod commands;

use std::fmt;

use crate::cli::{CertificateCommands, Commands, ConfigCommands, UserCommands};
use crate::runtime::lifetime::startup::prepare_startup;
use commands::{
    config_generate, create_admin, reconcile, revoke_certificate, set_role, verify_certificate,
};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::LmsError> for CliError {
    fn from(err: crate::errors::LmsError) -> Self {
        if err.is_server_error() {
            CliError::StorageError(err.to_string())
        } else {
            CliError::CommandError(err.to_string())
        }
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    // 生成配置文件不需要数据库
    if let Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    } = cmd
    {
        return config_generate(output_path, force);
    }

    let services = prepare_startup()
        .await
        .map_err(|e| CliError::StorageError(format!("{:#}", e)))?;

    match cmd {
        Commands::User { action } => match action {
            UserCommands::CreateAdmin {
                email,
                name,
                password,
                stdin,
            } => create_admin(&services, &email, &name, password, stdin).await,
            UserCommands::SetRole { email, role } => set_role(&services, &email, role).await,
        },
        Commands::Certificate { action } => match action {
            CertificateCommands::Verify { id } => verify_certificate(&services, &id).await,
            CertificateCommands::Revoke { id, reason } => {
                revoke_certificate(&services, &id, &reason).await
            }
        },
        Commands::Reconcile => reconcile(&services).await,
        Commands::Config { .. } => Ok(()),
    }
}
