//! Spreadsheet-style column labels.

/// Returns the spreadsheet label for a zero-based column index.
///
/// Labels use bijective base-26 (there is no zero digit), so `0` is `A`,
/// `25` is `Z`, `26` is `AA` and `702` is `AAA`.
pub fn column_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }

    letters.iter().rev().map(|&b| b as char).collect()
}
