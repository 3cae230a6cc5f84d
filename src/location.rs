//! Location resolution.
//!
//! A [`FileRecord`] names its bytes with up to two scheme-tagged location
//! strings. [`resolve`] walks an ordered policy table and turns them into a
//! single-candidate [`FetchPlan`]:
//!
//! | # | Field | Scheme | Outcome |
//! |---|-------|--------|---------|
//! | 1 | public  | `http(s)://` | fetch |
//! | 2 | primary | `http(s)://` | fetch |
//! | 3 | primary | existing local path | fetch |
//! | 4 | primary | `s3://` | unsupported |
//! | - | -       | anything else | unresolvable |
//!
//! The first matching row wins. Supporting a new scheme means adding a
//! [`Scheme`] variant and a row to the table.

use std::path::{Path, PathBuf};

use crate::models::FileRecord;

/// Scheme of a location descriptor. Prefixes match case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    S3,
    LocalPath,
}

impl Scheme {
    pub fn classify(location: &str) -> Scheme {
        if has_prefix(location, "http://") || has_prefix(location, "https://") {
            Scheme::Http
        } else if has_prefix(location, "s3://") {
            Scheme::S3
        } else {
            Scheme::LocalPath
        }
    }
}

fn has_prefix(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

/// Resolved instruction for retrieving one file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// GET the URL.
    Http { url: String },
    /// Read the local file.
    File { path: PathBuf },
    /// Remote-bucket reference with no public HTTP alias. Terminal.
    Unsupported { location: String },
    /// No rule matched.
    Unresolvable,
}

impl FetchPlan {
    /// The location the plan will read from, if any.
    pub fn candidate(&self) -> Option<String> {
        match self {
            FetchPlan::Http { url } => Some(url.clone()),
            FetchPlan::File { path } => Some(path.display().to_string()),
            FetchPlan::Unsupported { .. } | FetchPlan::Unresolvable => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Public,
    Primary,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Fetch,
    Unsupported,
}

struct PolicyRule {
    field: Field,
    scheme: Scheme,
    outcome: Outcome,
}

const POLICY: &[PolicyRule] = &[
    PolicyRule {
        field: Field::Public,
        scheme: Scheme::Http,
        outcome: Outcome::Fetch,
    },
    PolicyRule {
        field: Field::Primary,
        scheme: Scheme::Http,
        outcome: Outcome::Fetch,
    },
    PolicyRule {
        field: Field::Primary,
        scheme: Scheme::LocalPath,
        outcome: Outcome::Fetch,
    },
    PolicyRule {
        field: Field::Primary,
        scheme: Scheme::S3,
        outcome: Outcome::Unsupported,
    },
];

/// Resolve a primary and optional public location into a [`FetchPlan`].
///
/// An empty public location counts as absent. The local-path row only
/// matches when the path exists at resolution time.
pub fn resolve(primary_location: &str, public_location: Option<&str>) -> FetchPlan {
    let public_location = public_location.filter(|loc| !loc.trim().is_empty());

    for rule in POLICY {
        let location = match rule.field {
            Field::Public => match public_location {
                Some(loc) => loc,
                None => continue,
            },
            Field::Primary => primary_location,
        };

        if Scheme::classify(location) != rule.scheme {
            continue;
        }
        if rule.scheme == Scheme::LocalPath && !Path::new(location).exists() {
            continue;
        }

        return match (rule.outcome, rule.scheme) {
            (Outcome::Fetch, Scheme::Http) => FetchPlan::Http {
                url: location.to_string(),
            },
            (Outcome::Fetch, Scheme::LocalPath) => FetchPlan::File {
                path: PathBuf::from(location),
            },
            (Outcome::Fetch, Scheme::S3) | (Outcome::Unsupported, _) => FetchPlan::Unsupported {
                location: location.to_string(),
            },
        };
    }

    FetchPlan::Unresolvable
}

/// Resolve the locations stored on a [`FileRecord`].
pub fn resolve_file(file: &FileRecord) -> FetchPlan {
    resolve(&file.primary_location, file.public_location.as_deref())
}
