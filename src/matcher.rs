use std::collections::HashMap;

use serde::Serialize;

pub const DEFAULT_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Exact,
    Prefix,
    Fuzzy,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub query: String,
    pub matched_name: Option<String>,
    /// 100 for exact/prefix hits; the best fuzzy score otherwise, even when
    /// it fell below the threshold.
    pub score: u8,
    pub stage: Stage,
}

impl MatchResult {
    fn hit(query: &str, name: &str, score: u8, stage: Stage) -> Self {
        Self {
            query: query.to_string(),
            matched_name: Some(name.to_string()),
            score,
            stage,
        }
    }

    fn miss(query: &str, score: u8) -> Self {
        Self {
            query: query.to_string(),
            matched_name: None,
            score,
            stage: Stage::None,
        }
    }
}

/// Candidate names with their lowercase and fuzzy-normalised forms computed
/// once, so repeated lookups over the same catalog only score.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    names: Vec<String>,
    lowered: Vec<String>,
    processed: Vec<String>,
}

impl Candidates {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self::from_names(names.iter().map(|n| n.as_ref().to_string()).collect())
    }

    pub fn from_names(names: Vec<String>) -> Self {
        let lowered = names.iter().map(|n| n.to_lowercase()).collect();
        let processed = names.iter().map(|n| full_process(n)).collect();
        Self {
            names,
            lowered,
            processed,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolve a free-text query against catalog names.
///
/// Stages run in order and the first success wins: case-insensitive exact
/// match, case-insensitive prefix match, then the best partial-ratio score if
/// it reaches `threshold`. Ties in every stage go to the earliest candidate.
pub fn resolve<S: AsRef<str>>(query: &str, candidates: &[S], threshold: u8) -> MatchResult {
    resolve_in(query, &Candidates::new(candidates), threshold)
}

/// [`resolve`] over prepared candidates.
///
/// The exact and prefix stages compare the query as typed (lowercased, not
/// trimmed); only the fuzzy stage strips punctuation and surrounding space.
/// A blank query never matches.
pub fn resolve_in(query: &str, candidates: &Candidates, threshold: u8) -> MatchResult {
    if query.trim().is_empty() {
        return MatchResult::miss(query, 0);
    }
    let needle = query.to_lowercase();

    if let Some(i) = candidates.lowered.iter().position(|c| *c == needle) {
        return MatchResult::hit(query, &candidates.names[i], 100, Stage::Exact);
    }
    if let Some(i) = candidates.lowered.iter().position(|c| c.starts_with(&needle)) {
        return MatchResult::hit(query, &candidates.names[i], 100, Stage::Prefix);
    }

    let processed_query = full_process(query);
    let mut best: Option<(usize, u8)> = None;
    for (i, candidate) in candidates.processed.iter().enumerate() {
        let score = partial_ratio(&processed_query, candidate);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
            if score == 100 {
                break;
            }
        }
    }

    match best {
        Some((i, score)) if score >= threshold => {
            MatchResult::hit(query, &candidates.names[i], score, Stage::Fuzzy)
        }
        Some((_, score)) => MatchResult::miss(query, score),
        None => MatchResult::miss(query, 0),
    }
}

/// Replace everything that is not a word character with a space, lowercase,
/// and trim.
pub fn full_process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

/// Similarity (0-100) of the best-aligned window of the longer string
/// against the whole of the shorter one.
pub fn partial_ratio(s1: &str, s2: &str) -> u8 {
    if s1 == s2 {
        return 100;
    }
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut best = 0.0_f64;
    for block in SequenceMatcher::new(&shorter, &longer).matching_blocks() {
        let start = block.b.saturating_sub(block.a);
        let end = (start + shorter.len()).min(longer.len());
        let r = SequenceMatcher::new(&shorter, &longer[start..end]).ratio();
        if r > 0.995 {
            return 100;
        }
        best = best.max(r);
    }
    (best * 100.0).round_ties_even() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a: usize,
    b: usize,
    size: usize,
}

/// Ratcliff/Obershelp matcher over char sequences.
struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }
        // Elements filling more than 1% of a long `b` are too common to seed matches.
        if b.len() >= 200 {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, idxs| idxs.len() <= ntest);
        }
        Self { a, b, b2j }
    }

    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        let mut next: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            next.clear();
            if let Some(js) = self.b2j.get(&self.a[i]) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j > 0 {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    };
                    let k = prev + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            std::mem::swap(&mut j2len, &mut next);
        }

        // Grow across elements dropped from b2j as too popular.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Block {
            a: besti,
            b: bestj,
            size: bestsize,
        }
    }

    /// Non-adjacent matching blocks in order, terminated by a zero-size
    /// sentinel at `(len(a), len(b))`.
    fn matching_blocks(&self) -> Vec<Block> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            blocks.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
        }
        blocks.sort();

        let mut merged: Vec<Block> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }
        merged.push(Block {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|m| m.size).sum();
        2.0 * matches as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_beats_prefix() {
        let names = ["Paracetamol 650", "Paracetamol"];
        let m = resolve("paracetamol", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.matched_name.as_deref(), Some("Paracetamol"));
        assert_eq!(m.stage, Stage::Exact);
        assert_eq!(m.score, 100);

        let names = ["Paracetamol", "Paracetamol 650"];
        let m = resolve("paracetamol", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.matched_name.as_deref(), Some("Paracetamol"));
        assert_eq!(m.stage, Stage::Exact);
    }

    #[test]
    fn prefix_takes_first_in_input_order() {
        let names = ["Paracetamol", "Paraben"];
        let m = resolve("Para", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.matched_name.as_deref(), Some("Paracetamol"));
        assert_eq!(m.stage, Stage::Prefix);
        assert_eq!(m.score, 100);

        let names = ["Paraben", "Paracetamol"];
        let m = resolve("PARA", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.matched_name.as_deref(), Some("Paraben"));
    }

    #[test]
    fn fuzzy_matches_substring_queries() {
        let names = ["Dolo 650", "Amoxycillin 250mg Capsule", "Azithromycin 500"];
        let m = resolve("amoxycilin", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::Fuzzy);
        assert_eq!(m.matched_name.as_deref(), Some("Amoxycillin 250mg Capsule"));
        assert_eq!(m.score, 90);
    }

    #[test]
    fn fuzzy_threshold_is_inclusive() {
        let names = ["Azithromycin 500"];
        assert_eq!(partial_ratio("azithral", &full_process(names[0])), 75);

        let at = resolve("azithral", &names, 75);
        assert_eq!(at.stage, Stage::Fuzzy);
        assert_eq!(at.score, 75);

        let below = resolve("azithral", &names, 76);
        assert_eq!(below.stage, Stage::None);
        assert_eq!(below.matched_name, None);
        assert_eq!(below.score, 75);
    }

    #[test]
    fn fuzzy_ties_go_to_first_candidate() {
        let names = ["Dolo 650", "Zyrtec Cetirizine", "Cetirizine 10mg"];
        let m = resolve("cetrizine", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::Fuzzy);
        assert_eq!(m.score, 89);
        assert_eq!(m.matched_name.as_deref(), Some("Zyrtec Cetirizine"));
    }

    #[test]
    fn no_candidates_or_blank_query_is_no_match() {
        let empty: [&str; 0] = [];
        let m = resolve("dolo", &empty, DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::None);
        assert_eq!(m.score, 0);

        let m = resolve("   ", &["Dolo 650"], DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::None);
        assert_eq!(m.matched_name, None);
    }

    #[test]
    fn surrounding_space_skips_exact_and_prefix() {
        let names = ["Dolo 650", "Crocin"];
        let m = resolve(" dolo", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::Fuzzy);
        assert_eq!(m.score, 100);
        assert_eq!(m.matched_name.as_deref(), Some("Dolo 650"));

        let m = resolve("dolo 650 ", &names, DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::Fuzzy);
        assert_eq!(m.query, "dolo 650 ");
    }

    #[test]
    fn prepared_candidates_resolve_like_plain_names() {
        let names = ["Dolo 650", "Amoxycillin 250mg Capsule", "Azithromycin 500"];
        let prepared = Candidates::new(&names);
        assert_eq!(prepared.len(), 3);
        for query in ["dolo 650", "AMOX", "amoxycilin", "zzzz", ""] {
            assert_eq!(
                resolve_in(query, &prepared, DEFAULT_THRESHOLD),
                resolve(query, &names, DEFAULT_THRESHOLD),
                "{query:?}"
            );
        }
    }

    #[test]
    fn unrelated_query_scores_low() {
        let m = resolve("zzzz", &["Dolo 650", "Crocin"], DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::None);
        assert_eq!(m.score, 0);
    }

    #[test]
    fn partial_ratio_aligns_the_shorter_string() {
        assert_eq!(partial_ratio("paracet", "paracetamol 500mg"), 100);
        assert_eq!(partial_ratio("paracetamol 500mg", "paracet"), 100);
        assert_eq!(partial_ratio("abcd", "abxd"), 75);
        assert_eq!(partial_ratio("abcde", "abxde"), 80);
        assert_eq!(partial_ratio("", "abc"), 0);
        assert_eq!(partial_ratio("alegra", "allegra 120mg tablet"), 83);
    }

    #[test]
    fn fuzzy_stage_ignores_case_and_punctuation() {
        assert_eq!(full_process("  PARACET! "), "paracet");
        assert_eq!(full_process("Glycomet-500 (Metformin)"), "glycomet 500  metformin");
        let m = resolve("PARACET!", &["Dolo 650", "Paracetamol 500mg"], DEFAULT_THRESHOLD);
        assert_eq!(m.stage, Stage::Fuzzy);
        assert_eq!(m.score, 100);
        assert_eq!(m.matched_name.as_deref(), Some("Paracetamol 500mg"));
    }

    #[test]
    fn matching_blocks_end_with_sentinel() {
        let a: Vec<char> = "abxcd".chars().collect();
        let b: Vec<char> = "abcd".chars().collect();
        let blocks = SequenceMatcher::new(&a, &b).matching_blocks();
        assert_eq!(
            blocks,
            vec![
                Block { a: 0, b: 0, size: 2 },
                Block { a: 3, b: 2, size: 2 },
                Block { a: 5, b: 4, size: 0 },
            ]
        );
    }
}
