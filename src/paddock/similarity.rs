//! Ratcliff/Obershelp similarity over characters.
//!
//! Matches `difflib.SequenceMatcher(None, a, b).ratio()` for inputs shorter
//! than 200 characters, where its popularity heuristic never applies.

/// Longest common block in `a[alo..ahi]` and `b[blo..bhi]`, earliest on ties.
fn longest_match(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let mut prev = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut row = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                row[j - blo + 1] = k;
                if k > best_len {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_len = k;
                }
            }
        }
        prev = row;
    }
    (best_i, best_j, best_len)
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// `2 * M / T`, where M is the number of matched characters and T the
/// combined length. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_and_disjoint() {
        assert!(close(ratio("verstappen", "verstappen"), 1.0));
        assert!(close(ratio("abc", "xyz"), 0.0));
        assert!(close(ratio("", ""), 1.0));
        assert!(close(ratio("abc", ""), 0.0));
    }

    #[test]
    fn test_known_values() {
        assert!(close(ratio("abcd", "bcde"), 0.75));
        assert!(close(ratio("tide", "diet"), 0.25));
        assert!(close(ratio("norris on pole", "norris takes pole in monaco"), 48.0 / 82.0));
    }

    #[test]
    fn test_headline_variants() {
        let a = "verstappen wins the british grand prix";
        let b = "verstappen wins british grand prix";
        assert!(ratio(a, b) > 0.6);
        assert!(ratio(a, "ferrari unveils new floor upgrade") < 0.6);
    }
}
