use dialoguer::{Input, Password, theme::ColorfulTheme};

use super::LoginArgs;
use crate::config::{Config, TOKEN_ENV};
use crate::core::auth::AuthSession;
use crate::core::keychain;

pub async fn auth_login(config: &Config, args: LoginArgs) -> anyhow::Result<()> {
    let auth = config.supabase_auth()?;

    let email = match args.email {
        Some(email) => email,
        None => prompt_email()?,
    };
    let email = validate_email(&email)?;
    let password = prompt_password()?;

    let session = auth.sign_in_with_password(email, &password).await?;
    keychain::store_session(&session)?;

    println!("Stored session in system keychain");
    println!("Signed in as {}", display_user(&session));
    Ok(())
}

pub async fn auth_logout(config: &Config) -> anyhow::Result<()> {
    let Some(session) = keychain::load_session() else {
        println!("Not signed in");
        return Ok(());
    };

    // Revoking server-side is best effort; the local session goes regardless
    match config.supabase_auth() {
        Ok(auth) => {
            if let Err(e) = auth.sign_out(&session.access_token).await {
                tracing::warn!(error = %e, "failed to revoke session");
            }
        }
        Err(e) => tracing::debug!(error = %e, "skipping server-side sign out"),
    }

    keychain::delete_session()?;
    println!("Signed out {}", display_user(&session));
    Ok(())
}

pub fn auth_status(config: &Config) {
    if config.token.is_some() {
        println!("Using bearer token from {TOKEN_ENV}");
        return;
    }

    match keychain::load_session() {
        Some(session) => println!("{}", status_line(&session, chrono::Utc::now().timestamp())),
        None => println!("Not signed in (run `helpdesk auth login`)"),
    }
}

fn status_line(session: &AuthSession, now: i64) -> String {
    let user = display_user(session);
    let Some(expires_at) = session.expires_at else {
        return format!("Signed in as {user}");
    };

    let when = chrono::DateTime::from_timestamp(expires_at, 0).map_or_else(
        || expires_at.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string(),
    );

    if session.is_expired(now) {
        let refresh = if session.refresh_token.is_some() {
            "will refresh on next use"
        } else {
            "sign in again"
        };
        format!("Signed in as {user} (expired {when}, {refresh})")
    } else {
        format!("Signed in as {user} (expires {when})")
    }
}

fn display_user(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or(&session.user.id)
}

fn validate_email(email: &str) -> anyhow::Result<&str> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        anyhow::bail!("'{email}' is not an email address");
    }
    Ok(email)
}

fn prompt_email() -> anyhow::Result<String> {
    Ok(Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Email")
        .interact_text()?)
}

fn prompt_password() -> anyhow::Result<String> {
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .interact()?;

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    Ok(password)
}
