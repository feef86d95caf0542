//! Longest increasing subsequence, used to keep MOVE patches minimal.

/// Positions (into `seq`) of one longest strictly increasing subsequence.
///
/// Ties resolve toward the later candidate, so for `[1, 0]` the element at
/// position 1 is kept.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    // tails[k]: position of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (pos, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        if slot > 0 {
            prev[pos] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(pos);
        } else {
            tails[slot] = pos;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(pos) = cursor {
        result.push(pos);
        cursor = prev[pos];
    }
    result.reverse();
    result
}
