//! Ratcliff/Obershelp similarity, matching the ratio produced by Python's
//! `difflib.SequenceMatcher(None, a, b).ratio()` so scores stay comparable
//! with earlier Python-generated reports.

use std::collections::HashMap;

/// Sequences at least this long have very frequent elements dropped from the
/// match index.
const AUTOJUNK_MIN_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    a_start: usize,
    b_start: usize,
    size: usize,
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j = HashMap::<char, Vec<usize>>::new();
        for (index, character) in b.iter().enumerate() {
            b2j.entry(*character).or_default().push(index);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    fn longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> Block {
        let mut best = Block {
            a_start: a_lo,
            b_start: b_lo,
            size: 0,
        };
        let mut lengths = HashMap::<usize, usize>::new();

        for i in a_lo..a_hi {
            let mut next_lengths = HashMap::<usize, usize>::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < b_lo {
                        continue;
                    }
                    if j >= b_hi {
                        break;
                    }
                    let run = if j == 0 {
                        1
                    } else {
                        lengths.get(&(j - 1)).copied().unwrap_or(0) + 1
                    };
                    next_lengths.insert(j, run);
                    if run > best.size {
                        best = Block {
                            a_start: i + 1 - run,
                            b_start: j + 1 - run,
                            size: run,
                        };
                    }
                }
            }
            lengths = next_lengths;
        }

        // Elements dropped from the index can still extend a match at its edges.
        while best.a_start > a_lo
            && best.b_start > b_lo
            && self.a[best.a_start - 1] == self.b[best.b_start - 1]
        {
            best.a_start -= 1;
            best.b_start -= 1;
            best.size += 1;
        }
        while best.a_start + best.size < a_hi
            && best.b_start + best.size < b_hi
            && self.a[best.a_start + best.size] == self.b[best.b_start + best.size]
        {
            best.size += 1;
        }

        best
    }

    fn matched_len(&self) -> usize {
        let mut total = 0usize;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
            let block = self.longest_match(a_lo, a_hi, b_lo, b_hi);
            if block.size == 0 {
                continue;
            }
            total += block.size;
            if a_lo < block.a_start && b_lo < block.b_start {
                pending.push((a_lo, block.a_start, b_lo, block.b_start));
            }
            let a_end = block.a_start + block.size;
            let b_end = block.b_start + block.size;
            if a_end < a_hi && b_end < b_hi {
                pending.push((a_end, a_hi, b_end, b_hi));
            }
        }

        total
    }
}

/// `2 * M / (|a| + |b|)` where `M` counts characters in matching blocks.
/// Two empty strings are identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a = a.chars().collect::<Vec<char>>();
    let b = b.chars().collect::<Vec<char>>();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = Matcher::new(&a, &b).matched_len();
    2.0 * matched as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn identical_strings_score_one() {
        assert_close(sequence_ratio("cps 2232: data structure", "cps 2232: data structure"), 1.0);
        assert_close(sequence_ratio("", ""), 1.0);
    }

    #[test]
    fn disjoint_or_empty_side_scores_zero() {
        assert_close(sequence_ratio("abc", "xyz"), 0.0);
        assert_close(sequence_ratio("", "cps 2232"), 0.0);
    }

    #[test]
    fn matches_difflib_reference_values() {
        // difflib.SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert_close(sequence_ratio("abcd", "bcde"), 0.75);
        // difflib.SequenceMatcher(None, "abxcd", "abcd").ratio() == 8 / 9
        assert_close(sequence_ratio("abxcd", "abcd"), 8.0 / 9.0);
        // difflib.SequenceMatcher(None, "cps2232", "cps 2232").ratio() == 14 / 15
        assert_close(sequence_ratio("cps2232", "cps 2232"), 14.0 / 15.0);
    }

    #[test]
    fn ratio_is_symmetric_for_simple_inputs() {
        assert_close(
            sequence_ratio("data structure", "data structures"),
            sequence_ratio("data structures", "data structure"),
        );
    }
}
