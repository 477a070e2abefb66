//! Input validation and sanitization.
//!
//! Pure helpers for everything user-supplied: passwords, emails, todo
//! titles, and identifiers, plus the startup checks for the Supabase
//! configuration values. None of these touch the network; the only side
//! effect is a non-fatal warning when the configured URL does not look
//! like a Supabase project URL.

use thiserror::Error;
use url::Url;

pub const TODO_TITLE_MAX: usize = 500;
pub const EMAIL_MAX: usize = 254; // RFC 5321
pub const PASSWORD_MIN: usize = 12;
pub const PASSWORD_MAX: usize = 128;

const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

// Exact-match deny-list of passwords that satisfy the character-class
// rules but are still trivially guessable.
const COMMON_PASSWORDS: &[&str] = &[
    "Password123!",
    "Welcome123!",
    "Qwerty123!",
    "Admin123!",
    "Test1234!",
    "User1234!",
    "Pass1234!",
];

/// Error carrying a user-facing message for a rejected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Check password strength: length bounds, all four character classes,
/// and not on the common-password deny-list.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < PASSWORD_MIN {
        return Err(ValidationError::new(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        )));
    }
    if length > PASSWORD_MAX {
        return Err(ValidationError::new(format!(
            "Password must be less than {PASSWORD_MAX} characters"
        )));
    }

    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARS.contains(c));

    if !has_uppercase || !has_lowercase || !has_digit || !has_special {
        return Err(ValidationError::new(
            "Password must contain uppercase, lowercase, number, and special character",
        ));
    }

    if COMMON_PASSWORDS.contains(&password) {
        return Err(ValidationError::new(
            "Password is too common. Please choose a stronger password",
        ));
    }

    Ok(())
}

/// Structural email check: `local@domain.tld` with no whitespace and no
/// extra `@`. Deliberately not RFC-complete.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > EMAIL_MAX {
        return Err(ValidationError::new("Email is too long"));
    }
    if !email_shape_ok(email) {
        return Err(ValidationError::new("Invalid email format"));
    }
    Ok(())
}

fn email_shape_ok(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // The domain needs at least one dot with something on both sides.
    match domain.rsplit_once('.') {
        Some((left, right)) => !left.is_empty() && !right.is_empty(),
        None => false,
    }
}

/// Validate a todo title: non-empty and within bounds after trimming,
/// and free of script-injection markers in the raw input.
pub fn validate_todo_title(title: &str) -> Result<(), ValidationError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::new("Todo title cannot be empty"));
    }
    if trimmed.chars().count() > TODO_TITLE_MAX {
        return Err(ValidationError::new(format!(
            "Todo title must be less than {TODO_TITLE_MAX} characters"
        )));
    }
    if contains_xss_pattern(title) {
        return Err(ValidationError::new("Invalid characters in title"));
    }

    Ok(())
}

fn contains_xss_pattern(title: &str) -> bool {
    let lowered = title.to_lowercase();
    ["<script", "javascript:", "onerror=", "onclick="]
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Strip tag-shaped spans and the `javascript:` scheme from a title,
/// trim it, and cap it at [`TODO_TITLE_MAX`] characters. Applied to
/// every title after validation and before persistence.
pub fn sanitize_todo_title(title: &str) -> String {
    let stripped = strip_tags(title);
    let cleaned = remove_javascript_scheme(&stripped);
    cleaned.trim().chars().take(TODO_TITLE_MAX).collect()
}

// Removes `<...>` spans. An unterminated `<` is left as-is since it can
// no longer form a tag.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start + 1..].find('>') {
            Some(end) => rest = &rest[start + 1 + end + 1..],
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

// Case-insensitive removal of every `javascript:` occurrence.
fn remove_javascript_scheme(input: &str) -> String {
    const NEEDLE: &[u8] = b"javascript:";
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut skip_until = 0;
    for (i, c) in input.char_indices() {
        if i < skip_until {
            continue;
        }
        if bytes.len() - i >= NEEDLE.len()
            && bytes[i..i + NEEDLE.len()].eq_ignore_ascii_case(NEEDLE)
        {
            skip_until = i + NEEDLE.len();
            continue;
        }
        out.push(c);
    }
    out
}

/// True only for the canonical hyphenated 8-4-4-4-12 hex form,
/// case-insensitive.
pub fn is_valid_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &c)| match i {
        8 | 13 | 18 | 23 => c == b'-',
        _ => c.is_ascii_hexdigit(),
    })
}

/// Read a required environment variable, rejecting absent or blank
/// values.
pub fn get_env_var(key: &str) -> Result<String, ValidationError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::new(format!(
            "Missing required environment variable: {key}. Please check your .env file."
        ))),
    }
}

/// Require a parseable URL; warn (without failing) when the hostname
/// does not look like a Supabase project.
pub fn validate_supabase_url(url: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(url)
        .map_err(|_| ValidationError::new("SUPABASE_URL must be a valid URL"))?;
    let looks_like_supabase = parsed
        .host_str()
        .map_or(false, |host| host.contains("supabase"));
    if !looks_like_supabase {
        tracing::warn!("SUPABASE_URL does not appear to be a Supabase URL");
    }
    Ok(())
}

/// Reject obviously truncated API keys.
pub fn validate_supabase_key(key: &str) -> Result<(), ValidationError> {
    if key.len() < 20 {
        return Err(ValidationError::new(
            "SUPABASE_ANON_KEY appears to be invalid (too short)",
        ));
    }
    Ok(())
}
