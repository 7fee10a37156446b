//! Extraction rules: pure, per-line matchers that turn a dump line into at
//! most one [`MatchCandidate`].
//!
//! Four rules are provided:
//!
//! - [`DomainRule`] normalizes the host portion of URL-like lines and can
//!   optionally keep only domains containing a substring.
//! - [`EmailCredentialRule`] pairs the first email in a line with the token
//!   that follows it.
//! - [`CpfCredentialRule`] and [`CnpjCredentialRule`] do the same for 11- and
//!   14-digit Brazilian taxpayer ids.
//!
//! The password heuristic is deliberately loose: after the identifier, the
//! first run of characters that directly follows a `:`, `,` or whitespace and
//! contains none of them is taken as the secret. Nothing validates that this
//! token is a password, so trailing unrelated text can be captured.
use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://|android://|smtp://)?(?:www\.)?([^/]+)").expect("domain regex")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email regex")
});
// Separators are ASCII only; a no-break space is part of the password.
static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[:,\t\n\x0C\r ]([^:,\t\n\x0C\r ]+)").expect("password regex")
});
static DIGIT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run regex"));

/// Digits in a CPF.
pub const CPF_DIGITS: usize = 11;
/// Digits in a CNPJ.
pub const CNPJ_DIGITS: usize = 14;

/// A rule hit on a single line. Borrows from the scanned line where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate<'a> {
    /// Normalized domain, email, CPF or CNPJ.
    pub primary_key: Cow<'a, str>,
    /// Captured password for credential rules.
    pub secondary_value: Option<&'a str>,
    pub raw_line: &'a str,
}

impl<'a> MatchCandidate<'a> {
    /// Uniqueness key, which is also the line written to the artifact: the raw
    /// line for domain hits, `primary:secondary` for credential pairs.
    pub fn dedup_key(&self) -> Cow<'a, str> {
        match self.secondary_value {
            Some(secret) => Cow::Owned(format!("{}:{}", self.primary_key, secret)),
            None => Cow::Borrowed(self.raw_line),
        }
    }
}

/// Maps a line to zero or one candidate. Implementations hold no mutable
/// state and are shared by every worker without locking.
pub trait ExtractionRule: Send + Sync {
    /// Short label used in logs and progress output.
    fn name(&self) -> &'static str;

    fn apply<'a>(&self, line: &'a str) -> Option<MatchCandidate<'a>>;
}

#[derive(Debug, Clone, Default)]
pub struct DomainRule {
    needle: Option<String>,
}

impl DomainRule {
    /// Match every line that has a host portion.
    pub fn new() -> Self {
        Self { needle: None }
    }

    /// Keep only lines whose domain contains `needle`, case-insensitively.
    pub fn containing(needle: &str) -> Self {
        Self {
            needle: Some(needle.to_lowercase()),
        }
    }

    /// Extract the lowercased domain of a line, if any.
    pub fn domain_of(line: &str) -> Option<Cow<'_, str>> {
        let host = DOMAIN_RE.captures(line)?.get(1)?.as_str();
        Some(lowercase(host))
    }
}

impl ExtractionRule for DomainRule {
    fn name(&self) -> &'static str {
        match self.needle {
            Some(_) => "domain-filter",
            None => "domains",
        }
    }

    fn apply<'a>(&self, line: &'a str) -> Option<MatchCandidate<'a>> {
        let domain = Self::domain_of(line)?;
        if let Some(needle) = &self.needle {
            if !domain.contains(needle.as_str()) {
                return None;
            }
        }
        Some(MatchCandidate {
            primary_key: domain,
            secondary_value: None,
            raw_line: line,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmailCredentialRule;

impl ExtractionRule for EmailCredentialRule {
    fn name(&self) -> &'static str {
        "emails"
    }

    fn apply<'a>(&self, line: &'a str) -> Option<MatchCandidate<'a>> {
        let m = EMAIL_RE.find(line)?;
        credential_pair(line, m.start(), m.end())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CpfCredentialRule;

impl ExtractionRule for CpfCredentialRule {
    fn name(&self) -> &'static str {
        "cpf"
    }

    fn apply<'a>(&self, line: &'a str) -> Option<MatchCandidate<'a>> {
        digit_id_pair(line, CPF_DIGITS)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CnpjCredentialRule;

impl ExtractionRule for CnpjCredentialRule {
    fn name(&self) -> &'static str {
        "cnpj"
    }

    fn apply<'a>(&self, line: &'a str) -> Option<MatchCandidate<'a>> {
        digit_id_pair(line, CNPJ_DIGITS)
    }
}

/// First token following a separator in `rest`.
pub fn capture_password(rest: &str) -> Option<&str> {
    PASSWORD_RE
        .captures(rest)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// Digit runs are maximal, so a run of the wrong length can never hide a valid
// id inside it.
fn digit_id_pair(line: &str, digits: usize) -> Option<MatchCandidate<'_>> {
    let m = DIGIT_RUN_RE.find_iter(line).find(|m| m.len() == digits)?;
    credential_pair(line, m.start(), m.end())
}

fn credential_pair(line: &str, start: usize, end: usize) -> Option<MatchCandidate<'_>> {
    let secret = capture_password(&line[end..])?;
    Some(MatchCandidate {
        primary_key: Cow::Borrowed(&line[start..end]),
        secondary_value: Some(secret),
        raw_line: line,
    })
}

fn lowercase(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_uppercase) {
        Cow::Owned(s.to_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}
