//! Line-level alignment of an original contract against its remediated copy.

use serde::{Deserialize, Serialize};

/// Unchanged rows kept on each side of a change when collapsing.
pub const DEFAULT_CONTEXT_RADIUS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Equal,
    Insert,
    Delete,
}

/// One side-by-side row. `Delete` has only `left`, `Insert` only `right`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRow {
    pub left: Option<String>,
    pub right: Option<String>,
    pub kind: DiffKind,
}

impl DiffRow {
    fn equal(line: &str) -> Self {
        Self {
            left: Some(line.to_string()),
            right: Some(line.to_string()),
            kind: DiffKind::Equal,
        }
    }

    fn delete(line: &str) -> Self {
        Self {
            left: Some(line.to_string()),
            right: None,
            kind: DiffKind::Delete,
        }
    }

    fn insert(line: &str) -> Self {
        Self {
            left: None,
            right: Some(line.to_string()),
            kind: DiffKind::Insert,
        }
    }

    pub fn is_change(&self) -> bool {
        self.kind != DiffKind::Equal
    }
}

/// Align two texts line by line with a longest-common-subsequence table.
///
/// `dp[i][j]` holds the LCS length of `left[i..]` and `right[j..]`, so the
/// walk runs forward from (0, 0). On a tie the left line is emitted as a
/// Delete before the right line is emitted as an Insert.
pub fn align(left: &str, right: &str) -> Vec<DiffRow> {
    let a: Vec<&str> = left.split('\n').collect();
    let b: Vec<&str> = right.split('\n').collect();
    let (n, m) = (a.len(), b.len());
    let width = m + 1;

    let mut dp = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i * width + j] = if a[i] == b[j] {
                dp[(i + 1) * width + j + 1] + 1
            } else {
                dp[(i + 1) * width + j].max(dp[i * width + j + 1])
            };
        }
    }

    let mut rows = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            rows.push(DiffRow::equal(a[i]));
            i += 1;
            j += 1;
        } else if dp[(i + 1) * width + j] >= dp[i * width + j + 1] {
            rows.push(DiffRow::delete(a[i]));
            i += 1;
        } else {
            rows.push(DiffRow::insert(b[j]));
            j += 1;
        }
    }
    rows.extend(a[i..].iter().map(|l| DiffRow::delete(l)));
    rows.extend(b[j..].iter().map(|l| DiffRow::insert(l)));
    rows
}

/// Keep changed rows and up to `radius` unchanged rows on either side.
pub fn collapse_unchanged(rows: &[DiffRow], radius: usize) -> Vec<DiffRow> {
    let mut keep = vec![false; rows.len()];
    for (idx, _) in rows.iter().enumerate().filter(|(_, r)| r.is_change()) {
        let lo = idx.saturating_sub(radius);
        let hi = idx.saturating_add(radius).min(rows.len() - 1);
        keep[lo..=hi].iter_mut().for_each(|k| *k = true);
    }
    rows.iter()
        .zip(keep)
        .filter_map(|(row, kept)| kept.then(|| row.clone()))
        .collect()
}

pub fn change_count(rows: &[DiffRow]) -> usize {
    rows.iter().filter(|r| r.is_change()).count()
}
