//! Near-duplicate detection for resource names.
//!
//! Before a "new" resource is submitted to the remote database, its name is
//! scanned against everything already known for the galaxy. Misspelled
//! re-submissions ("Ironn" for "Iron") are a constant source of junk in the
//! community data, so suspiciously close names are surfaced to the user
//! before the submission goes out.

/// One known resource whose name sits suspiciously close to a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateWarning {
    /// Index into the scanned sequence, for the caller to map back to its
    /// own records.
    pub index: usize,
    pub name: String,
    pub class_name: String,
    /// Edit distance between the normalized names.
    pub distance: usize,
}

/// Scan `known` (pairs of resource name and class display name) for names
/// within edit distance 4 of `candidate_name`.
///
/// Comparison is case- and diacritics-insensitive. An exact same-name,
/// same-class entry is skipped — that is the same resource, not a near
/// duplicate. How close a name must be to flag depends on the shorter of
/// the two names:
///
/// - 8+ characters: any distance below 4 flags
/// - 4+ characters: distance up to 2 flags
/// - 3+ characters: only distance up to 1 flags
///
/// Flagged pairs are then filtered by a coarse class fingerprint so that
/// unrelated classes with coincidentally similar resource names don't warn:
/// only pairs whose fingerprints are themselves within distance 4 survive.
pub fn find_near_duplicates<'a>(
    candidate_name: &str,
    candidate_class_name: &str,
    known: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<DuplicateWarning> {
    let cand = normalize_name(candidate_name);
    let cand_fp = class_fingerprint(candidate_class_name);
    let mut warnings = Vec::new();

    for (index, (name, class_name)) in known.into_iter().enumerate() {
        let other = normalize_name(name);
        if other == cand && class_name.eq_ignore_ascii_case(candidate_class_name) {
            continue;
        }

        let distance = levenshtein(&cand, &other);
        if distance >= 4 {
            continue;
        }

        let min_len = cand.chars().count().min(other.chars().count());
        let flagged = min_len >= 8
            || (min_len >= 4 && distance <= 2)
            || (min_len >= 3 && distance <= 1);
        if !flagged {
            continue;
        }

        if levenshtein(&cand_fp, &class_fingerprint(class_name)) > 4 {
            continue;
        }

        warnings.push(DuplicateWarning {
            index,
            name: name.to_string(),
            class_name: class_name.to_string(),
            distance,
        });
    }

    warnings
}

/// Lowercase and fold common Latin diacritics to their base letters.
/// Resource names come from free-form player input; "Nabóo" and "Naboo"
/// must compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    let c = c.to_lowercase().next().unwrap_or(c);
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Coarse fingerprint of a class display name: the first 3 letters of up
/// to the first 3 words, concatenated. "Desh Copper" -> "descop".
fn class_fingerprint(class_name: &str) -> String {
    let mut fp = String::with_capacity(9);
    for word in class_name.split_whitespace().take(3) {
        fp.extend(word.chars().filter(|c| c.is_alphabetic()).take(3));
    }
    normalize_name(&fp)
}

/// Classic Levenshtein edit distance over chars, two-row dynamic program.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
#[path = "tests/dedupe_tests.rs"]
mod tests;
