//! INN (Russian taxpayer identifier) checksum validation.
//!
//! A legal entity INN has 10 digits with one check digit; an individual INN
//! has 12 digits with two. Every check digit is `(Σ wᵢ·dᵢ mod 11) mod 10`.

const WEIGHTS_10: [u32; 9] = [2, 4, 10, 3, 5, 9, 4, 6, 8];
const WEIGHTS_12_FIRST: [u32; 10] = [7, 2, 4, 10, 3, 5, 9, 4, 6, 8];
const WEIGHTS_12_SECOND: [u32; 11] = [3, 7, 2, 4, 10, 3, 5, 9, 4, 6, 8];

/// What a valid INN identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnKind {
    /// 10 digits.
    LegalEntity,
    /// 12 digits: individuals and sole proprietors.
    Individual,
}

/// Returns true when `inn` is a 10 or 12 digit identifier with correct check
/// digits. Never panics.
pub fn is_valid(inn: &str) -> bool {
    classify(inn).is_some()
}

/// Classifies a checksum-valid INN, `None` for anything else.
pub fn classify(inn: &str) -> Option<InnKind> {
    if inn.is_empty() || !inn.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: Vec<u32> = inn.bytes().map(|b| u32::from(b - b'0')).collect();

    match digits.len() {
        10 => (check_digit(&digits, &WEIGHTS_10) == digits[9]).then_some(InnKind::LegalEntity),
        12 => {
            let first = check_digit(&digits, &WEIGHTS_12_FIRST) == digits[10];
            let second = check_digit(&digits, &WEIGHTS_12_SECOND) == digits[11];
            (first && second).then_some(InnKind::Individual)
        }
        _ => None,
    }
}

/// Weighted sum over the leading `weights.len()` digits, reduced to one digit.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    (sum % 11) % 10
}
