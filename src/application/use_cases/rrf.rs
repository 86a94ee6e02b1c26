use std::collections::HashMap;

use crate::domain::models::{Retriever, SearchHit};

/// Reciprocal rank fusion constant from spec §4.I step 3: `score(d) =
/// sum_r 1 / (k + rank_r(d))`. Exposed as a default so callers can override
/// via config without the formula itself changing.
pub const DEFAULT_K: f64 = 60.0;

#[derive(Debug, Clone, Copy)]
pub struct RrfWeights {
    pub lexical: f64,
    pub fuzzy: f64,
    pub vector: f64,
}

impl Default for RrfWeights {
    fn default() -> Self {
        Self {
            lexical: 1.0,
            fuzzy: 1.0,
            vector: 1.0,
        }
    }
}

impl RrfWeights {
    fn weight_for(&self, retriever: Retriever) -> f64 {
        match retriever {
            Retriever::Lexical => self.lexical,
            Retriever::Fuzzy => self.fuzzy,
            Retriever::Vector => self.vector,
        }
    }
}

/// One retriever's ranked output, already truncated to `limit * 3` and
/// min-max normalized to `[0, 1]` by the caller (spec §4.I steps 1–2).
pub struct RetrieverRun {
    pub retriever: Retriever,
    pub hits: Vec<SearchHit>,
}

/// Fuses ranked lists from up to three retrievers into one, tie-broken by
/// file path then line for determinism (spec §4.I step 5, property 8).
pub fn rrf_fuse(runs: Vec<RetrieverRun>, weights: RrfWeights, k: f64, limit: usize) -> Vec<SearchHit> {
    let mut fused: HashMap<(String, String, u32), (f64, SearchHit)> = HashMap::new();

    for run in runs {
        let weight = weights.weight_for(run.retriever);
        for (rank, hit) in run.hits.into_iter().enumerate() {
            let key = (hit.repo_id.clone(), hit.relative_path.clone(), hit.line);
            let contribution = weight / (k + rank as f64 + 1.0);
            fused
                .entry(key)
                .and_modify(|(score, existing)| {
                    *score += contribution;
                    if !existing.retrievers.contains(&run.retriever) {
                        existing.retrievers.push(run.retriever);
                    }
                })
                .or_insert_with(|| {
                    let mut merged = hit.clone();
                    merged.retrievers = vec![run.retriever];
                    (contribution, merged)
                });
        }
    }

    let mut results: Vec<SearchHit> = fused
        .into_values()
        .map(|(score, mut hit)| {
            hit.score = score;
            hit
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.relative_path.cmp(&b.relative_path))
            .then_with(|| a.line.cmp(&b.line))
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(path: &str, line: u32) -> SearchHit {
        SearchHit {
            file_id: 1,
            repo_id: "repo".into(),
            relative_path: path.into(),
            line,
            snippet: String::new(),
            score: 0.0,
            retrievers: vec![],
        }
    }

    #[test]
    fn agreement_across_retrievers_outranks_single_hit() {
        let lexical = RetrieverRun {
            retriever: Retriever::Lexical,
            hits: vec![hit("a.py", 1), hit("b.py", 1)],
        };
        let fuzzy = RetrieverRun {
            retriever: Retriever::Fuzzy,
            hits: vec![hit("b.py", 1), hit("a.py", 1)],
        };
        let fused = rrf_fuse(vec![lexical, fuzzy], RrfWeights::default(), DEFAULT_K, 10);
        assert_eq!(fused.len(), 2);
        assert!(fused[0].retrievers.len() >= 1);
    }

    #[test]
    fn deterministic_tie_break_by_path_then_line() {
        let run = RetrieverRun {
            retriever: Retriever::Lexical,
            hits: vec![hit("b.py", 1), hit("a.py", 1)],
        };
        let fused = rrf_fuse(vec![run], RrfWeights::default(), DEFAULT_K, 10);
        assert_eq!(fused[0].relative_path, "a.py");
        assert_eq!(fused[1].relative_path, "b.py");
    }
}
