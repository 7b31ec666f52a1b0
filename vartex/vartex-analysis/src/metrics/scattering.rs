//! Scattering and tangling degrees.
//!
//! A feature constant is *scattered* over every distinct signature that
//! mentions it; a signature is *tangled* with every feature constant it
//! mentions. Mentions are whole-word, so `FOO` does not match `FOOBAR`.
//!
//! These measurements are taken over the project-wide distinct signatures
//! after merging; a constant that is used in a conditional but never defined
//! still counts, which makes the degrees an over-approximation by design of
//! the underlying data, not of this code.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

fn word_regex(word: &str) -> Option<Regex> {
    match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(word, %err, "cannot build word-boundary pattern");
            None
        }
    }
}

/// For every feature constant, the number of signatures mentioning it.
pub fn scattering_degrees<S: AsRef<str>>(
    signatures: &[S],
    defines: impl IntoIterator<Item = impl AsRef<str>>,
) -> BTreeMap<String, usize> {
    let mut degrees = BTreeMap::new();
    for define in defines {
        let define = define.as_ref();
        let Some(re) = word_regex(define) else {
            continue;
        };
        let count = signatures
            .iter()
            .filter(|sig| re.is_match(sig.as_ref()))
            .count();
        degrees.insert(define.to_string(), count);
    }
    degrees
}

/// For every signature, the number of feature constants it mentions.
pub fn tangling_degrees<S: AsRef<str>>(
    signatures: &[S],
    defines: impl IntoIterator<Item = impl AsRef<str>>,
) -> BTreeMap<String, usize> {
    let mut degrees: BTreeMap<String, usize> = signatures
        .iter()
        .map(|sig| (sig.as_ref().to_string(), 0))
        .collect();
    for define in defines {
        let Some(re) = word_regex(define.as_ref()) else {
            continue;
        };
        for (sig, count) in degrees.iter_mut() {
            if re.is_match(sig) {
                *count += 1;
            }
        }
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGS: [&str; 3] = ["A", "(!(A)) && (B)", "(!(A)) && (!(B))"];

    #[test]
    fn scattering_counts_signatures_per_define() {
        let scat = scattering_degrees(&SIGS, ["A", "B"]);
        assert_eq!(scat["A"], 3);
        assert_eq!(scat["B"], 2);
    }

    #[test]
    fn tangling_counts_defines_per_signature() {
        let tang = tangling_degrees(&SIGS, ["A", "B"]);
        assert_eq!(tang["A"], 1);
        assert_eq!(tang["(!(A)) && (B)"], 2);
        assert_eq!(tang["(!(A)) && (!(B))"], 2);
    }

    #[test]
    fn matching_is_whole_word() {
        let sigs = ["FOOBAR", "FOO && BAR"];
        let scat = scattering_degrees(&sigs, ["FOO"]);
        assert_eq!(scat["FOO"], 1);
    }

    #[test]
    fn unreferenced_define_scores_zero() {
        let scat = scattering_degrees(&SIGS, ["MISSING"]);
        assert_eq!(scat["MISSING"], 0);
    }
}
