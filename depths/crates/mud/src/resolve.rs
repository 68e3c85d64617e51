//! Tiered name matching: exact, then prefix, then substring, all
//! case-insensitive. The first tier with any match decides.

use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Prefix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Found { item: T, tier: MatchTier },
    /// Distinct candidate names that matched in the deciding tier.
    Ambiguous(Vec<String>),
    NotFound,
}

impl<T> Resolution<T> {
    /// `kind` is the plural noun used in the ambiguity message.
    pub fn into_result(
        self,
        query: &str,
        kind: &'static str,
        not_found: impl FnOnce() -> String,
    ) -> Result<T, GameError> {
        match self {
            Resolution::Found { item, .. } => Ok(item),
            Resolution::Ambiguous(candidates) => Err(GameError::Ambiguous {
                query: query.to_string(),
                kind,
                candidates,
            }),
            Resolution::NotFound => Err(GameError::NotFound(not_found())),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found { item, .. } => Some(item),
            _ => None,
        }
    }
}

fn tier_of(query: &str, name: &str) -> Option<MatchTier> {
    let name = name.to_lowercase();
    if name == query {
        Some(MatchTier::Exact)
    } else if name.starts_with(query) {
        Some(MatchTier::Prefix)
    } else if name.contains(query) {
        Some(MatchTier::Substring)
    } else {
        None
    }
}

/// Resolve `query` against `(value, display name)` pairs.
///
/// Candidates sharing a name are interchangeable, so several copies of
/// "Rat" resolve to the first rather than counting as ambiguous.
pub fn resolve<'a, T>(
    query: &str,
    candidates: impl IntoIterator<Item = (T, &'a str)>,
) -> Resolution<T> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Resolution::NotFound;
    }

    let mut best: Option<MatchTier> = None;
    let mut matches: Vec<(T, &'a str)> = Vec::new();

    for (item, name) in candidates {
        let Some(tier) = tier_of(&query, name) else {
            continue;
        };
        match best {
            Some(b) if tier > b => continue,
            Some(b) if tier == b => matches.push((item, name)),
            _ => {
                best = Some(tier);
                matches.clear();
                matches.push((item, name));
            }
        }
    }

    let Some(tier) = best else {
        return Resolution::NotFound;
    };

    let mut names: Vec<String> = Vec::new();
    let mut folded: Vec<String> = Vec::new();
    for (_, name) in &matches {
        let lower = name.to_lowercase();
        if !folded.contains(&lower) {
            folded.push(lower);
            names.push(name.to_string());
        }
    }

    if tier != MatchTier::Exact && names.len() > 1 {
        return Resolution::Ambiguous(names);
    }

    match matches.into_iter().next() {
        Some((item, _)) => Resolution::Found { item, tier },
        None => Resolution::NotFound,
    }
}
