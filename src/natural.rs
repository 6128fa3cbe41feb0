//! Human-friendly name ordering: embedded digit runs compare by value.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

impl<'a> Run<'a> {
    fn as_str(&self) -> &'a str {
        match self {
            Run::Digits(s) | Run::Text(s) => s,
        }
    }
}

/// A name split into maximal all-digit / non-digit runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameParts<'a> {
    runs: Vec<Run<'a>>,
}

impl<'a> FileNameParts<'a> {
    pub fn new(name: &'a str) -> Self {
        let mut runs = Vec::new();
        let mut start = 0;
        let mut in_digits = None;
        for (i, ch) in name.char_indices() {
            let digit = ch.is_ascii_digit();
            match in_digits {
                Some(prev) if prev != digit => {
                    runs.push(make_run(&name[start..i], prev));
                    start = i;
                }
                _ => {}
            }
            in_digits = Some(digit);
        }
        if let Some(digit) = in_digits {
            runs.push(make_run(&name[start..], digit));
        }
        Self { runs }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

fn make_run(s: &str, digit: bool) -> Run<'_> {
    if digit { Run::Digits(s) } else { Run::Text(s) }
}

impl Ord for FileNameParts<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.runs.iter().zip(&other.runs) {
            let ord = match (a, b) {
                (Run::Digits(x), Run::Digits(y)) => cmp_numeric(x, y),
                _ => a.as_str().cmp(b.as_str()),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.runs.len().cmp(&other.runs.len())
    }
}

impl PartialOrd for FileNameParts<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Arbitrary-length digit runs: compare significant digits without parsing.
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural comparison of two names.
pub fn compare(a: &str, b: &str) -> Ordering {
    FileNameParts::new(a).cmp(&FileNameParts::new(b))
}

/// Sort in place by a name projection using [`compare`].
pub fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| compare(name(a), name(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_numerically() {
        assert_eq!(compare("img2.png", "img10.png"), Ordering::Less);
        assert_eq!("img2.png".cmp("img10.png"), Ordering::Greater);
        assert_eq!(compare("S01E009", "S01E10"), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(compare("a", "a1"), Ordering::Less);
        assert_eq!(compare("", "a"), Ordering::Less);
    }

    #[test]
    fn antisymmetric_and_reflexive() {
        let names = ["a", "a1", "a01", "b", "img10.png", "img2.png", "第2集", "第10集", "10", "x9y", "x10"];
        for a in names {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in names {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        assert_eq!(compare("v99999999999999999999999", "v100000000000000000000000"), Ordering::Less);
    }

    #[test]
    fn splits_into_runs() {
        let parts = FileNameParts::new("ep12part3.mkv");
        assert_eq!(parts.len(), 5);
        assert!(FileNameParts::new("").is_empty());
    }

    #[test]
    fn sorts_listing() {
        let mut names = vec!["ep10.mp4", "ep1.mp4", "ep2.mp4"];
        sort_by_name(&mut names, |s| *s);
        assert_eq!(names, ["ep1.mp4", "ep2.mp4", "ep10.mp4"]);
    }
}
