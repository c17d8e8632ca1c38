//! The constraint grammar from §4.3. Resolution is pure and entirely
//! over `version_number` ordering — tag strings are parsed as semver
//! only for the `^`/`~` operators, and only as a best-effort major /
//! major.minor comparison with a documented fallback to `>=X` when a
//! tag doesn't parse. No other operator ever interprets a tag as a
//! version number.

use computor_core::error::ComputorError;

/// One version row as the resolver sees it: its tag and its
/// `version_number` (the only field the ordering operators compare).
#[derive(Debug, Clone, Copy)]
pub struct VersionRow<'a> {
    pub tag: &'a str,
    pub number: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// No operator: highest `version_number`.
    Latest,
    Exact(String),
    Gte(String),
    Lte(String),
    Gt(String),
    Lt(String),
    Caret(String),
    Tilde(String),
}

impl Constraint {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Constraint::Latest;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Constraint::Latest;
        }
        if let Some(rest) = raw.strip_prefix(">=") {
            Constraint::Gte(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("<=") {
            Constraint::Lte(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix('>') {
            Constraint::Gt(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix('<') {
            Constraint::Lt(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix('^') {
            Constraint::Caret(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix('~') {
            Constraint::Tilde(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("==") {
            Constraint::Exact(rest.to_string())
        } else {
            Constraint::Exact(raw.to_string())
        }
    }
}

fn find_exact<'a>(versions: &[VersionRow<'a>], tag: &str) -> Option<VersionRow<'a>> {
    versions.iter().copied().find(|v| v.tag == tag)
}

fn highest<'a>(versions: &[VersionRow<'a>]) -> Option<VersionRow<'a>> {
    versions.iter().copied().max_by_key(|v| v.number)
}

/// Resolve a constraint against every version row for one example.
/// `versions` need not be sorted.
pub fn resolve<'a>(
    slug: &str,
    versions: &[VersionRow<'a>],
    constraint: &Constraint,
) -> Result<VersionRow<'a>, ComputorError> {
    if versions.is_empty() {
        return Err(ComputorError::UnknownSlug(slug.to_string()));
    }

    match constraint {
        Constraint::Latest => {
            highest(versions).ok_or_else(|| ComputorError::UnknownSlug(slug.to_string()))
        }
        Constraint::Exact(tag) => find_exact(versions, tag)
            .ok_or_else(|| ComputorError::UnknownTag(format!("{slug}@{tag}"))),
        Constraint::Gte(tag) => {
            let Some(t) = find_exact(versions, tag) else {
                return Err(ComputorError::NoMatchingVersion(format!("{slug} >={tag}")));
            };
            versions
                .iter()
                .copied()
                .filter(|v| v.number >= t.number)
                .min_by_key(|v| v.number)
                .ok_or_else(|| ComputorError::NoMatchingVersion(format!("{slug} >={tag}")))
        }
        Constraint::Lte(tag) => {
            let Some(t) = find_exact(versions, tag) else {
                return Err(ComputorError::NoMatchingVersion(format!("{slug} <={tag}")));
            };
            versions
                .iter()
                .copied()
                .filter(|v| v.number <= t.number)
                .max_by_key(|v| v.number)
                .ok_or_else(|| ComputorError::NoMatchingVersion(format!("{slug} <={tag}")))
        }
        Constraint::Gt(tag) => {
            let Some(t) = find_exact(versions, tag) else {
                return Err(ComputorError::NoMatchingVersion(format!("{slug} >{tag}")));
            };
            versions
                .iter()
                .copied()
                .filter(|v| v.number > t.number)
                .min_by_key(|v| v.number)
                .ok_or_else(|| ComputorError::NoMatchingVersion(format!("{slug} >{tag}")))
        }
        Constraint::Lt(tag) => {
            let Some(t) = find_exact(versions, tag) else {
                return Err(ComputorError::NoMatchingVersion(format!("{slug} <{tag}")));
            };
            versions
                .iter()
                .copied()
                .filter(|v| v.number < t.number)
                .max_by_key(|v| v.number)
                .ok_or_else(|| ComputorError::NoMatchingVersion(format!("{slug} <{tag}")))
        }
        Constraint::Caret(tag) => resolve_semver_bucket(slug, versions, tag, SemverBucket::Major),
        Constraint::Tilde(tag) => resolve_semver_bucket(slug, versions, tag, SemverBucket::Minor),
    }
}

#[derive(Clone, Copy)]
enum SemverBucket {
    Major,
    Minor,
}

/// `^X`/`~X`: same major (or major.minor) when every candidate tag
/// parses as semver; otherwise fall back to `>=X`, per the documented
/// exception in §4.3 and §9 ("no in-workflow version parsing ... except
/// for `^`/`~`").
fn resolve_semver_bucket<'a>(
    slug: &str,
    versions: &[VersionRow<'a>],
    tag: &str,
    bucket: SemverBucket,
) -> Result<VersionRow<'a>, ComputorError> {
    let base = find_exact(versions, tag)
        .ok_or_else(|| ComputorError::UnknownTag(format!("{slug}@{tag}")))?;

    let parse = |t: &str| semver::Version::parse(t.trim_start_matches('v')).ok();
    let Some(base_semver) = parse(tag) else {
        return resolve(slug, versions, &Constraint::Gte(tag.to_string()));
    };

    let same_bucket = versions.iter().copied().filter(|v| match parse(v.tag) {
        Some(sv) => match bucket {
            SemverBucket::Major => sv.major == base_semver.major,
            SemverBucket::Minor => sv.major == base_semver.major && sv.minor == base_semver.minor,
        },
        None => false,
    });

    same_bucket
        .filter(|v| v.number >= base.number)
        .min_by_key(|v| v.number)
        .ok_or_else(|| ComputorError::NoMatchingVersion(format!("{slug} ~/^ {tag}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows<'a>(pairs: &'a [(&'a str, i64)]) -> Vec<VersionRow<'a>> {
        pairs
            .iter()
            .map(|(tag, number)| VersionRow { tag, number: *number })
            .collect()
    }

    #[test]
    fn unconstrained_picks_highest_version_number() {
        let versions = rows(&[("v1.0", 1), ("v1.1", 2), ("v1.2", 3)]);
        let resolved = resolve("alg.base", &versions, &Constraint::Latest).unwrap();
        assert_eq!(resolved.tag, "v1.2");
    }

    #[test]
    fn gte_picks_smallest_satisfying_version() {
        let versions = rows(&[("v1.0", 1), ("v1.1", 2), ("v1.2", 3)]);
        let c = Constraint::parse(Some(">=v1.1"));
        let resolved = resolve("alg.base", &versions, &c).unwrap();
        assert_eq!(resolved.tag, "v1.1");
    }

    #[test]
    fn unresolvable_constraint_is_no_matching_version() {
        let versions = rows(&[("v1.0", 1), ("v1.2", 3)]);
        let c = Constraint::parse(Some(">=v9.9"));
        assert!(matches!(
            resolve("alg.base", &versions, &c),
            Err(ComputorError::NoMatchingVersion(_))
        ));
    }

    #[test]
    fn exact_constraint_with_unknown_tag_is_unknown_tag() {
        let versions = rows(&[("v1.0", 1)]);
        let c = Constraint::parse(Some("==v9.9"));
        assert!(matches!(
            resolve("alg.base", &versions, &c),
            Err(ComputorError::UnknownTag(_))
        ));
    }

    #[test]
    fn caret_falls_back_when_tags_dont_parse_as_semver() {
        let versions = rows(&[("alpha", 1), ("beta", 2)]);
        let c = Constraint::parse(Some("^alpha"));
        let resolved = resolve("x", &versions, &c).unwrap();
        assert_eq!(resolved.tag, "alpha");
    }

    #[test]
    fn caret_restricts_to_same_major() {
        let versions = rows(&[("1.0.0", 1), ("1.4.0", 2), ("2.0.0", 3)]);
        let c = Constraint::parse(Some("^1.0.0"));
        let resolved = resolve("x", &versions, &c).unwrap();
        assert_eq!(resolved.tag, "1.0.0");
    }
}
