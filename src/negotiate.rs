//! `Accept` header parsing and representation selection.
//!
//! Clauses are ranked by quality, then by specificity (concrete type before
//! `*`, concrete subtype before `*`). Selection walks the ranked clauses and,
//! for each one, the candidate list in the order the caller gave it. The
//! first candidate a clause covers wins.

use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiateError {
    #[error("malformed media range `{0}`")]
    MalformedMediaRange(String),

    #[error("malformed media type parameter `{0}`")]
    MalformedParameter(String),

    #[error("no acceptable representation")]
    NotAcceptable,
}

/// One media range of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub media_type: String,
    pub subtype: String,
    pub q: f32,
    pub params: Vec<(String, String)>,
}

impl Clause {
    fn wildcard() -> Self {
        Self {
            media_type: "*".to_string(),
            subtype: "*".to_string(),
            q: 1.0,
            params: Vec::new(),
        }
    }

    /// `type/subtype` form of this clause.
    pub fn range(&self) -> String {
        format!("{}/{}", self.media_type, self.subtype)
    }

    /// Does this clause cover `candidate` (a bare `type/subtype`)?
    pub fn covers(&self, candidate: &str) -> bool {
        let (ty, sub) = candidate.split_once('/').unwrap_or((candidate, ""));
        if self.media_type == "*" {
            return true;
        }
        if !self.media_type.eq_ignore_ascii_case(ty) {
            return false;
        }
        self.subtype == "*" || self.subtype.eq_ignore_ascii_case(sub)
    }

    fn rank(&self, other: &Self) -> Ordering {
        other
            .q
            .partial_cmp(&self.q)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (self.media_type == "*").cmp(&(other.media_type == "*")))
            .then_with(|| (self.subtype == "*").cmp(&(other.subtype == "*")))
            .then_with(|| {
                (&self.media_type, &self.subtype, &self.params)
                    .cmp(&(&other.media_type, &other.subtype, &other.params))
            })
    }
}

/// Parse an `Accept` header value into ranked clauses.
///
/// Clauses of equal quality and specificity are ordered by range, so the
/// result does not depend on header order. An empty value yields an empty
/// list.
pub fn parse_accept(header: &str) -> Result<Vec<Clause>, NegotiateError> {
    let mut clauses = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut pieces = part.split(';');
        let range = pieces.next().unwrap_or_default().trim();
        let (media_type, subtype) = if range == "*" {
            ("*", "*")
        } else {
            range
                .split_once('/')
                .filter(|(t, s)| !t.is_empty() && !s.is_empty())
                .ok_or_else(|| NegotiateError::MalformedMediaRange(range.to_string()))?
        };

        let mut clause = Clause {
            media_type: media_type.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            q: 1.0,
            params: Vec::new(),
        };

        for param in pieces {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| NegotiateError::MalformedParameter(param.to_string()))?;
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if key.eq_ignore_ascii_case("q") {
                clause.q = value
                    .parse::<f32>()
                    .ok()
                    .filter(|q| (0.0..=1.0).contains(q))
                    .ok_or_else(|| NegotiateError::MalformedParameter(param.to_string()))?;
            } else {
                clause.params.push((key.to_string(), value.to_string()));
            }
        }

        clauses.push(clause);
    }

    clauses.sort_by(Clause::rank);
    Ok(clauses)
}

/// Pick the representation for ranked `clauses` among `candidates`.
pub fn negotiate<'a>(clauses: &[Clause], candidates: &[&'a str]) -> Result<&'a str, NegotiateError> {
    clauses
        .iter()
        .find_map(|clause| candidates.iter().find(|c| clause.covers(c)))
        .copied()
        .ok_or(NegotiateError::NotAcceptable)
}

/// Ranked clauses for an optional header value; an absent header means `*/*`.
pub fn clauses(header: Option<&str>) -> Result<Vec<Clause>, NegotiateError> {
    match header {
        None => Ok(vec![Clause::wildcard()]),
        Some(value) => parse_accept(value),
    }
}

/// Like [`negotiate`], except that an empty clause list (a present but
/// empty header) accepts the first candidate.
pub fn choose<'a>(clauses: &[Clause], candidates: &[&'a str]) -> Result<&'a str, NegotiateError> {
    if clauses.is_empty() {
        return candidates.first().copied().ok_or(NegotiateError::NotAcceptable);
    }
    negotiate(clauses, candidates)
}
