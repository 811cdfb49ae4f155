use keyring::Entry;

use super::auth::AuthSession;
use super::{Error, Result};

const SERVICE_NAME: &str = "helpdesk-cli";
const SESSION_ACCOUNT: &str = "supabase-session";

fn entry(account: &str) -> Result<Entry> {
    Entry::new(SERVICE_NAME, account).map_err(|e| Error::Keychain(e.to_string()))
}

pub fn store_session(session: &AuthSession) -> Result<()> {
    store_session_as(SESSION_ACCOUNT, session)
}

pub fn load_session() -> Option<AuthSession> {
    load_session_as(SESSION_ACCOUNT)
}

pub fn delete_session() -> Result<()> {
    delete_session_as(SESSION_ACCOUNT)
}

fn store_session_as(account: &str, session: &AuthSession) -> Result<()> {
    let json = serde_json::to_string(session)?;
    entry(account)?
        .set_password(&json)
        .map_err(|e| Error::Keychain(e.to_string()))
}

fn load_session_as(account: &str) -> Option<AuthSession> {
    let json = entry(account).ok()?.get_password().ok()?;
    match serde_json::from_str(&json) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable stored session");
            None
        }
    }
}

fn delete_session_as(account: &str) -> Result<()> {
    match entry(account)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(Error::Keychain(e.to_string())),
    }
}
