//! Personal notes stored in the Supabase `memories` table.

use std::sync::Arc;

use reqwest::{RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::auth::{SupabaseAuth, TokenProvider, require_token};
use super::{Error, Result, http};

const TABLE: &str = "memories";

/// A stored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub description: String,
    pub user_id: String,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Which notes to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteScope {
    /// Everything row-level security lets the user see, newest first.
    #[default]
    Mine,
    /// Only notes marked public.
    Shared,
}

/// Title and body of a note being written.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
    pub is_public: bool,
}

impl NoteDraft {
    fn validate(&self) -> Result<(&str, &str)> {
        let title = self.title.trim();
        let description = self.description.trim();
        if title.is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()));
        }
        if description.is_empty() {
            return Err(Error::Validation("description must not be empty".to_string()));
        }
        Ok((title, description))
    }
}

/// Client for the notes table.
#[derive(Clone)]
pub struct NotesClient {
    auth: SupabaseAuth,
    tokens: Arc<dyn TokenProvider>,
    table_url: Url,
}

impl NotesClient {
    /// Create a client for the project `auth` points at.
    pub fn new(auth: SupabaseAuth, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let table_url = http::endpoint(auth.url(), &["rest", "v1", TABLE])?;
        Ok(Self {
            auth,
            tokens,
            table_url,
        })
    }

    async fn request(&self, method: reqwest::Method) -> Result<(RequestBuilder, String)> {
        let token = require_token(self.tokens.as_ref()).await?;
        let builder = self
            .auth
            .http()
            .request(method, self.table_url.clone())
            .header("apikey", self.auth.anon_key())
            .bearer_auth(&token);
        Ok((builder, token))
    }

    /// List notes, newest first.
    pub async fn list(&self, scope: NoteScope) -> Result<Vec<Note>> {
        let (builder, _) = self.request(reqwest::Method::GET).await?;
        let mut query = vec![("select", "*"), ("order", "created_at.desc")];
        if scope == NoteScope::Shared {
            query.push(("is_public", "eq.true"));
        }

        let response = builder.query(&query).send().await?;
        Ok(http::check(response).await?.json().await?)
    }

    /// Create a note owned by the signed-in user.
    pub async fn create(&self, draft: &NoteDraft) -> Result<Note> {
        let (title, description) = draft.validate()?;
        let (builder, token) = self.request(reqwest::Method::POST).await?;
        let user = self.auth.user(&token).await?;

        let response = builder
            .header("Prefer", "return=representation")
            .json(&json!([{
                "title": title,
                "description": description,
                "user_id": user.id,
                "is_public": draft.is_public,
            }]))
            .send()
            .await?;

        let note = single(http::check(response).await?.json().await?, "created note")?;
        tracing::info!(note_id = %note.id, "created note");
        Ok(note)
    }

    /// Replace a note's title, body and visibility.
    pub async fn update(&self, id: &str, draft: &NoteDraft) -> Result<Note> {
        let (title, description) = draft.validate()?;
        let (builder, _) = self.request(reqwest::Method::PATCH).await?;
        let id_filter = format!("eq.{id}");

        let response = builder
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&json!({
                "title": title,
                "description": description,
                "is_public": draft.is_public,
                "updated_at": chrono::Utc::now().to_rfc3339(),
            }))
            .send()
            .await?;

        single(http::check(response).await?.json().await?, id)
    }

    /// Delete a note.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let (builder, _) = self.request(reqwest::Method::DELETE).await?;
        let id_filter = format!("eq.{id}");

        let response = builder.query(&[("id", id_filter.as_str())]).send().await?;
        http::check(response).await?;
        tracing::info!(note_id = %id, "deleted note");
        Ok(())
    }
}

/// PostgREST returns the affected rows as an array.
fn single(rows: Vec<Note>, what: &str) -> Result<Note> {
    rows.into_iter().next().ok_or_else(|| Error::Api {
        status: 404,
        message: format!("note not found: {what}"),
    })
}
