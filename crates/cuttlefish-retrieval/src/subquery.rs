//! Sub-query generation for comprehensive retrieval.
//!
//! Comprehensive retrieval searches the original query plus any sub-queries a
//! `SubQueryGenerator` derives from it. Generation is pluggable; the default
//! splits compound questions on conjunctions and clause punctuation.

/// Derives additional search queries from a user query.
///
/// Returned sub-queries never include the original query itself.
pub trait SubQueryGenerator: Send + Sync {
    fn generate(&self, query: &str) -> Vec<String>;
}

/// Generator that never produces sub-queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubQueries;

impl SubQueryGenerator for NoSubQueries {
    fn generate(&self, _query: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Splits compound queries into clauses.
///
/// "Parser leaks memory and build fails offline" yields
/// `["Parser leaks memory", "build fails offline"]`.
#[derive(Debug, Clone)]
pub struct ConjunctionSplitter {
    /// Words that separate clauses (matched case-insensitively, whole words)
    pub conjunctions: Vec<String>,

    /// Clauses shorter than this many words are discarded
    pub min_words: usize,

    /// Upper bound on returned sub-queries
    pub max_sub_queries: usize,
}

impl Default for ConjunctionSplitter {
    fn default() -> Self {
        Self {
            conjunctions: ["and", "or", "but", "also", "plus", "then", "while"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_words: 2,
            max_sub_queries: 4,
        }
    }
}

impl ConjunctionSplitter {
    pub fn new(max_sub_queries: usize) -> Self {
        Self {
            max_sub_queries,
            ..Default::default()
        }
    }

    fn is_conjunction(&self, word: &str) -> bool {
        self.conjunctions
            .iter()
            .any(|c| c.eq_ignore_ascii_case(word))
    }
}

impl SubQueryGenerator for ConjunctionSplitter {
    fn generate(&self, query: &str) -> Vec<String> {
        let mut clauses: Vec<Vec<&str>> = vec![Vec::new()];

        for token in query.split_whitespace() {
            let bare = token.trim_end_matches([',', ';', '?', '!', '.']);
            let ends_clause = bare.len() != token.len();

            if self.is_conjunction(bare) {
                clauses.push(Vec::new());
                continue;
            }
            if !bare.is_empty() {
                if let Some(current) = clauses.last_mut() {
                    current.push(bare);
                }
            }
            if ends_clause {
                clauses.push(Vec::new());
            }
        }

        let original = normalize(query);
        let mut out: Vec<String> = Vec::new();
        for clause in clauses {
            if clause.len() < self.min_words {
                continue;
            }
            let text = clause.join(" ");
            let key = normalize(&text);
            if key == original || out.iter().any(|seen| normalize(seen) == key) {
                continue;
            }
            out.push(text);
            if out.len() >= self.max_sub_queries {
                break;
            }
        }
        out
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
