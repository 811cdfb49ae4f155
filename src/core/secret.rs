//! Secret masking for logs and error output
//!
//! Error bodies from the backends can echo request headers or tokens back.
//! Everything surfaced to the terminal or to tracing goes through here first.

use std::borrow::Cow;

use regex::Regex;

/// Patterns that match the credentials this client handles
const SECRET_PATTERNS: &[(&str, &str)] = &[
    // Bearer tokens
    (r"(?i)bearer\s+[a-zA-Z0-9._-]+", "[MASKED_BEARER_TOKEN]"),
    // Supabase access tokens and legacy anon/service keys are JWTs
    (r"eyJ[a-zA-Z0-9_-]+\.eyJ[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+", "[MASKED_JWT]"),
    // Supabase publishable and secret keys
    (r"sb_publishable_[a-zA-Z0-9_-]{16,}", "[MASKED_SUPABASE_KEY]"),
    (r"sb_secret_[a-zA-Z0-9_-]{16,}", "[MASKED_SUPABASE_KEY]"),
    // Refresh tokens echoed in JSON bodies
    (r#"(?i)"refresh_token"\s*:\s*"[^"]+""#, r#""refresh_token":"[MASKED]""#),
    (r"(?i)apikey\s*[:=]\s*[a-zA-Z0-9._-]{16,}", "[MASKED_SECRET]"),
];

/// Compiled secret patterns
pub struct SecretMasker {
    patterns: Vec<(Regex, &'static str)>,
}

impl Default for SecretMasker {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretMasker {
    /// Create a masker with the default patterns
    #[must_use]
    pub fn new() -> Self {
        let patterns = SECRET_PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|re| (re, *replacement))
            })
            .collect();

        Self { patterns }
    }

    /// Mask secrets in a string
    #[must_use]
    pub fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(text);

        for (pattern, replacement) in &self.patterns {
            if pattern.is_match(&result) {
                result = Cow::Owned(pattern.replace_all(&result, *replacement).into_owned());
            }
        }

        result
    }
}

static MASKER: std::sync::LazyLock<SecretMasker> = std::sync::LazyLock::new(SecretMasker::new);

/// Mask secrets in a string using the global masker
#[must_use]
pub fn mask_secrets(text: &str) -> Cow<'_, str> {
    MASKER.mask(text)
}
