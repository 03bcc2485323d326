//! Best-candidate fuzzy matching over a fixed set of normalised keys.
//!
//! Every query is scored against every candidate; there is no index or
//! blocking, which is fine for spreadsheet-sized inputs.

use fuzzywuzzy::fuzz;

/// Default acceptance threshold for CNPJ/CPF keys.
pub const CNPJ_THRESHOLD: u8 = 90;
/// Default acceptance threshold for company names.
pub const NAME_THRESHOLD: u8 = 80;

/// String similarity function producing a score in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scorer {
    /// Matching-blocks ratio over the whole string. Used for identifiers.
    Ratio,
    /// Ratio over sorted token sets, insensitive to word order and to extra
    /// words such as "ltda" or "me". Used for company names.
    TokenSetRatio,
}

impl Scorer {
    /// Scores `candidate` against `query`. Both sides go through
    /// [`full_process`] first, so case and punctuation never count.
    pub fn score(self, query: &str, candidate: &str) -> u8 {
        match self {
            Scorer::Ratio => ratio(&full_process(query), &full_process(candidate)),
            Scorer::TokenSetRatio => token_set_ratio(query, candidate),
        }
    }
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub key: String,
    pub score: u8,
}

/// Scores queries against a fixed list of candidate keys.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    candidates: Vec<String>,
    scorer: Scorer,
    threshold: u8,
}

impl FuzzyMatcher {
    pub fn new(candidates: Vec<String>, scorer: Scorer, threshold: u8) -> Self {
        Self {
            candidates,
            scorer,
            threshold,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Highest scoring candidate regardless of threshold. Among equal scores
    /// the earliest candidate wins. `None` when there are no candidates.
    pub fn best_match(&self, query: &str) -> Option<Match> {
        let mut best: Option<Match> = None;
        for candidate in &self.candidates {
            let score = self.scorer.score(query, candidate);
            if best.as_ref().is_none_or(|current| score > current.score) {
                best = Some(Match {
                    key: candidate.clone(),
                    score,
                });
                if score == 100 {
                    break;
                }
            }
        }
        best
    }

    /// Best candidate if its score reaches the threshold.
    pub fn find(&self, query: &str) -> Option<Match> {
        self.best_match(query)
            .filter(|found| found.score >= self.threshold)
    }
}

/// Lowercases, turns every character that is not alphanumeric (or `_`) into a
/// space and trims.
pub fn full_process(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '_' {
                ch
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Matching-blocks similarity of two strings scaled to `0..=100`. Empty
/// input scores 0.
pub fn ratio(lhs: &str, rhs: &str) -> u8 {
    if lhs.is_empty() || rhs.is_empty() {
        return 0;
    }
    fuzz::ratio(lhs, rhs)
}

/// Best ratio among the shared sorted tokens and each side's full token set.
/// Both strings are lowercased and stripped of punctuation first.
pub fn token_set_ratio(lhs: &str, rhs: &str) -> u8 {
    if full_process(lhs).is_empty() || full_process(rhs).is_empty() {
        return 0;
    }
    fuzz::token_set_ratio(lhs, rhs, true, true)
}
