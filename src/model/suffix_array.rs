//! # Suffix Array Construction
//!
//! Prefix-doubling construction over the sentinel-terminated symbol text.
//! Each round sorts suffixes by their first `2k` symbols using the rank
//! pairs from the previous round, stopping early once all ranks are
//! distinct.

/// Build the suffix array of `text` (already sentinel-terminated)
pub fn build_suffix_array(text: &[u32]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<i64> = text.iter().map(|&s| s as i64).collect();
    let mut next_rank: Vec<i64> = vec![0; n];

    let mut k = 1usize;
    while k < n {
        let key = |i: usize| {
            let second = if i + k < n { rank[i + k] } else { -1 };
            (rank[i], second)
        };
        sa.sort_unstable_by(|&a, &b| key(a).cmp(&key(b)));

        next_rank[sa[0]] = 0;
        for i in 1..n {
            let bump = (key(sa[i]) != key(sa[i - 1])) as i64;
            next_rank[sa[i]] = next_rank[sa[i - 1]] + bump;
        }
        rank.copy_from_slice(&next_rank);
        if rank[sa[n - 1]] as usize == n - 1 {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|i| i as u32).collect()
}

/// Build the BWT from the text and its suffix array
pub fn build_bwt(text: &[u32], sa: &[u32]) -> Vec<u32> {
    let n = text.len();
    sa.iter()
        .map(|&p| {
            let i = p as usize;
            if i == 0 {
                text[n - 1]
            } else {
                text[i - 1]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u32]) -> Vec<u32> {
        let mut sa: Vec<usize> = (0..text.len()).collect();
        sa.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
        sa.into_iter().map(|i| i as u32).collect()
    }

    #[test]
    fn test_sa_small() {
        // acgt$ encoded with sentinel 0
        let text = vec![1u32, 2, 3, 4, 0];
        assert_eq!(build_suffix_array(&text), vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn test_sa_matches_naive_with_markers() {
        let text = vec![1u32, 5, 3, 6, 4, 5, 2, 0];
        assert_eq!(build_suffix_array(&text), naive_sa(&text));
    }

    #[test]
    fn test_sa_matches_naive_repetitive() {
        let text = vec![1u32, 2, 1, 2, 1, 2, 1, 2, 1, 0];
        assert_eq!(build_suffix_array(&text), naive_sa(&text));
    }

    #[test]
    fn test_bwt_rotates_previous_symbol() {
        let text = vec![1u32, 2, 3, 4, 0];
        let sa = build_suffix_array(&text);
        let bwt = build_bwt(&text, &sa);
        // sa = [4,0,1,2,3]; previous symbols wrap at position 0
        assert_eq!(bwt, vec![4, 0, 1, 2, 3]);
    }
}
