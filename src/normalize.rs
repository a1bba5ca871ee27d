//! Row normalization: raw CSV cells in, a validated [`UserRecord`] or a
//! [`RejectionReason`] out. Nothing in here touches I/O.

use csv_async::StringRecord;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Columns every users file must carry, matched exactly against the header line.
pub const REQUIRED_HEADERS: [&str; 3] = ["name", "surname", "email"];

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// `local@label.label[.label...]`: no whitespace or `@` anywhere but the
/// separator, and every domain label non-empty.
fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("Invalid email regex")
    })
}

/// One data line of the CSV, keyed by the header it was read under.
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<StringRecord>,
    values: StringRecord,
    line: u64,
}

impl RawRow {
    pub fn new(headers: Arc<StringRecord>, values: StringRecord, line: u64) -> Self {
        Self {
            headers,
            values,
            line,
        }
    }

    /// Build a row from `(column, value)` pairs. Handy when rows don't come from a file.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let (headers, values): (Vec<&str>, Vec<&str>) = pairs.into_iter().unzip();
        Self::new(
            Arc::new(StringRecord::from(headers)),
            StringRecord::from(values),
            0,
        )
    }

    /// Cell under `column`, or `None` when the header lacks it or the row is short.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx)
    }

    /// 1-based data line (the header line is not counted).
    pub fn line(&self) -> u64 {
        self.line
    }
}

/// Why a row was left out of the import. Rejections are terminal for the row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("missing column '{0}'")]
    MissingField(&'static str),
    #[error("empty '{0}'")]
    EmptyField(&'static str),
    #[error("invalid email format: {0}")]
    InvalidEmailFormat(String),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// A validated, normalized user. Only [`UserRecord::new`] (and therefore
/// [`normalize`]) can build one, so the email is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    name: String,
    surname: String,
    email: String,
}

impl UserRecord {
    pub fn new(name: &str, surname: &str, email: &str) -> Result<Self, RejectionReason> {
        let name = capitalize(name).ok_or(RejectionReason::EmptyField("name"))?;
        let surname = capitalize(surname).ok_or(RejectionReason::EmptyField("surname"))?;
        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            return Err(RejectionReason::InvalidEmailFormat(email));
        }
        Ok(Self {
            name,
            surname,
            email,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Normalize one raw row.
pub fn normalize(row: &RawRow) -> Result<UserRecord, RejectionReason> {
    let [name, surname, email] = REQUIRED_HEADERS.map(|column| {
        row.get(column)
            .ok_or(RejectionReason::MissingField(column))
    });
    UserRecord::new(name?, surname?, email?)
}

/// First character upper-cased, the rest lower-cased. `None` for an empty string.
///
/// When the upper case of the first character expands (ß -> SS), only the
/// leading char of the expansion stays upper; the remainder joins the tail.
pub fn capitalize(value: &str) -> Option<String> {
    let mut chars = value.chars();
    let mut upper = chars.next()?.to_uppercase();
    let mut out = String::with_capacity(value.len());
    out.extend(upper.next());
    out.extend(upper.chain(chars).flat_map(char::to_lowercase));
    Some(out)
}

/// Shape check for an already lower-cased email.
///
/// Both the pattern and the "a dot after the first `@`" test must pass.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
        && email
            .split_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}
