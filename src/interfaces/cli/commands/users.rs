//! 账号管理命令

use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::startup::AppServices;
use crate::storage::Role;

/// 从不同来源获取密码
fn get_password(password: Option<String>, stdin: bool) -> Result<String, CliError> {
    if stdin {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| CliError::ParseError(format!("Failed to read from stdin: {}", e)))?;
        Ok(line.trim().to_string())
    } else if let Some(pwd) = password {
        Ok(pwd)
    } else {
        prompt_password_with_confirm()
    }
}

/// 交互式输入密码（带确认）
fn prompt_password_with_confirm() -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::ParseError(
            "No password provided. Use --password or --stdin flag, or run interactively."
                .to_string(),
        ));
    }

    let read = |prompt: &str| -> Result<String, CliError> {
        print!("{}", prompt);
        io::stdout()
            .flush()
            .map_err(|e| CliError::CommandError(e.to_string()))?;
        rpassword::read_password()
            .map_err(|e| CliError::ParseError(format!("Failed to read password: {}", e)))
    };

    let password = read("Password: ")?;
    let confirm = read("Confirm password: ")?;
    if password != confirm {
        return Err(CliError::ParseError("Passwords do not match".to_string()));
    }
    Ok(password)
}

pub async fn create_admin(
    services: &AppServices,
    email: &str,
    name: &str,
    password: Option<String>,
    stdin: bool,
) -> Result<(), CliError> {
    let password = get_password(password, stdin)?;
    let user = services
        .auth
        .create_user(name, email, &password, Role::Admin, None)
        .await?;

    println!(
        "{} Admin account created: {} ({})",
        "✓".green().bold(),
        user.email.cyan(),
        user.id.dimmed()
    );
    Ok(())
}

pub async fn set_role(services: &AppServices, email: &str, role: Role) -> Result<(), CliError> {
    let user = services
        .storage
        .find_user_by_email(&email.trim().to_lowercase())
        .await?
        .ok_or_else(|| CliError::CommandError(format!("No user with email {}", email)))?;

    services.storage.set_user_role(&user.id, role).await?;
    println!(
        "{} {} is now {}",
        "✓".green().bold(),
        user.email.cyan(),
        role.to_string().bold()
    );
    Ok(())
}
