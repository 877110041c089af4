//! Authentication commands for the TaskMaster CLI.
//!
//! Signing in (anonymously or with email and password) persists the session
//! locally. The first sign-in on a device uploads existing local data.

use clap::{Args, Subcommand};
use std::io::{self, BufRead, Write};

use taskmaster_core::AuthErrorCategory;

use super::AppContext;

/// Authentication commands
#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand)]
pub enum AuthSubcommand {
    /// Sign in without an account
    Anonymous,
    /// Sign in with email and password, creating the account if needed
    Login {
        /// Account email
        #[arg(long, short)]
        email: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Sign out and continue with local data only
    Logout,
    /// Work locally without signing in
    Skip,
    /// Show authentication status
    Status,
}

impl AuthCommand {
    pub async fn run(&self, ctx: &mut AppContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AuthSubcommand::Anonymous => {
                let session = ctx.sessions.sign_in_anonymously().await?;
                println!("Signed in as {}", session.label());
                ctx.connect().await;
                Ok(())
            }
            AuthSubcommand::Login { email, password } => {
                let email = match email {
                    Some(email) => email.clone(),
                    None => prompt("Email: ")?,
                };
                let password = match password {
                    Some(password) => password.clone(),
                    None => prompt("Password: ")?,
                };

                match ctx.sessions.sign_in_with_password(&email, &password).await {
                    Ok(session) => {
                        println!("Signed in as {}", session.label());
                        ctx.connect().await;
                        Ok(())
                    }
                    Err(e) => {
                        if e.category() == AuthErrorCategory::WrongCredential {
                            eprintln!("Check your email and password and try again.");
                        }
                        Err(e.into())
                    }
                }
            }
            AuthSubcommand::Logout => {
                if ctx.sessions.current().is_none() {
                    println!("Not signed in.");
                    return Ok(());
                }
                // The local session is gone even if the server call failed.
                if let Err(e) = ctx.sessions.sign_out().await {
                    eprintln!("Warning: server sign-out failed: {}", e);
                }
                println!("Signed out. Local data stays on this device.");
                Ok(())
            }
            AuthSubcommand::Skip => {
                ctx.sessions.skip_login();
                println!("Working in local mode.");
                Ok(())
            }
            AuthSubcommand::Status => {
                match ctx.sessions.current() {
                    Some(session) => {
                        println!("Signed in as {}", session.label());
                        println!("User ID: {}", session.user_id);
                        println!(
                            "Sync:    {}",
                            if session.sync_enabled {
                                "enabled"
                            } else {
                                "disabled"
                            }
                        );
                    }
                    None if ctx.sessions.login_skipped() => {
                        println!("Not signed in (local mode)");
                    }
                    None => {
                        println!("Not signed in");
                        println!();
                        println!("Run 'taskmaster auth login' or 'taskmaster auth anonymous' to sync.");
                    }
                }
                Ok(())
            }
        }
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
