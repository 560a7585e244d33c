//! Pattern classification and matching.
//!
//! Four pattern modes, selected by prefix:
//!
//! - no prefix — fnmatch-style wildcards with path-component and `cmd:args`
//!   handling (the matching applied by [`crate::eval`], which also tries a
//!   path-normalized candidate);
//! - `[regex]` — unanchored regular-expression search;
//! - `[glob]` — whole-string glob where `*` stays within one path component
//!   and `**` crosses separators, with `~` expanded on both sides;
//! - `[native]` — word-level wildcard matching: literal segments between
//!   `*` must appear in order.

pub mod normalize;

use glob::{MatchOptions, Pattern};
use regex::Regex;

/// How a pattern string should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Default,
    Regex,
    Glob,
    Native,
}

/// Classify a pattern string and strip its mode prefix.
///
/// Both the whole string and the remainder after the prefix are trimmed.
/// With `extended_syntax` off, everything is [`PatternKind::Default`].
pub fn parse_pattern(pattern: &str, extended_syntax: bool) -> (PatternKind, &str) {
    let pattern = pattern.trim();
    if !extended_syntax {
        return (PatternKind::Default, pattern);
    }
    if let Some(rest) = pattern.strip_prefix("[regex]") {
        return (PatternKind::Regex, rest.trim());
    }
    if let Some(rest) = pattern.strip_prefix("[glob]") {
        return (PatternKind::Glob, rest.trim());
    }
    if let Some(rest) = pattern.strip_prefix("[native]") {
        return (PatternKind::Native, rest.trim());
    }
    (PatternKind::Default, pattern)
}

/// Match a candidate string against a single pattern in the given mode.
///
/// Invalid regex or glob patterns never match; a pattern that cannot be
/// compiled must not accidentally allow anything.
pub fn match_pattern(kind: PatternKind, pattern: &str, candidate: &str) -> bool {
    match kind {
        PatternKind::Regex => match Regex::new(pattern) {
            Ok(re) => re.is_match(candidate),
            Err(_) => false,
        },
        PatternKind::Glob => glob_match(pattern, candidate),
        PatternKind::Native => native_match(pattern, candidate),
        PatternKind::Default => fnmatch(candidate, pattern),
    }
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern = shellexpand::tilde(pattern);
    let candidate = shellexpand::tilde(candidate);
    // `*` must not cross `/`; only `**` does.
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };
    match Pattern::new(&pattern) {
        Ok(p) => p.matches_with(&candidate, options),
        Err(_) => false,
    }
}

/// Word-level wildcard matching: split the pattern on `*` and require the
/// literal segments to appear in order, anchored at the start unless the
/// pattern opens with `*` and at the end unless it closes with one.
fn native_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }
    let segments: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        let Some(found) = candidate[pos..].find(segment) else {
            return false;
        };
        let idx = pos + found;
        if i == 0 && !pattern.starts_with('*') && idx != 0 {
            return false;
        }
        pos = idx + segment.len();
    }
    if let Some(last) = segments.last()
        && !last.is_empty()
        && !pattern.ends_with('*')
        && pos != candidate.len()
    {
        return false;
    }
    true
}

/// fnmatch-style wildcard test: `*` matches any run of characters
/// (including spaces and `/`), `?` matches one. Implemented by translating
/// the pattern into an anchored regex.
pub(crate) fn fnmatch(text: &str, pattern: &str) -> bool {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    re.push('$');
    match Regex::new(&re) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Classification ──

    #[test]
    fn classify_default() {
        assert_eq!(parse_pattern("git *", true), (PatternKind::Default, "git *"));
    }

    #[test]
    fn classify_prefixes() {
        assert_eq!(
            parse_pattern("[regex]^git status$", true),
            (PatternKind::Regex, "^git status$")
        );
        assert_eq!(
            parse_pattern("[glob]/tmp/**", true),
            (PatternKind::Glob, "/tmp/**")
        );
        assert_eq!(
            parse_pattern("[native]git * main", true),
            (PatternKind::Native, "git * main")
        );
    }

    #[test]
    fn classify_trims_both_sides() {
        assert_eq!(
            parse_pattern("  [native]npm *  ", true),
            (PatternKind::Native, "npm *")
        );
    }

    #[test]
    fn classify_extended_syntax_off() {
        assert_eq!(
            parse_pattern("[regex]^git", false),
            (PatternKind::Default, "[regex]^git")
        );
    }

    // ── Regex mode ──

    #[test]
    fn regex_searches_unanchored() {
        assert!(match_pattern(PatternKind::Regex, "status", "git status"));
        assert!(match_pattern(
            PatternKind::Regex,
            "^git (status|log)",
            "git log --oneline"
        ));
        assert!(!match_pattern(PatternKind::Regex, "^rm", "git rm --cached"));
    }

    #[test]
    fn regex_invalid_never_matches() {
        assert!(!match_pattern(PatternKind::Regex, "([unclosed", "anything"));
    }

    // ── Glob mode ──

    #[test]
    fn glob_star_stays_in_component() {
        assert!(match_pattern(PatternKind::Glob, "/tmp/*.txt", "/tmp/file.txt"));
        assert!(!match_pattern(
            PatternKind::Glob,
            "/tmp/*.txt",
            "/tmp/sub/file.txt"
        ));
    }

    #[test]
    fn glob_globstar_crosses_components() {
        assert!(match_pattern(
            PatternKind::Glob,
            "/Users/*/projects/**/*.py",
            "/Users/alice/projects/app/src/main.py"
        ));
        assert!(!match_pattern(
            PatternKind::Glob,
            "/a/*/c/*.txt",
            "/a/b1/b2/c/file.txt"
        ));
    }

    #[test]
    fn glob_is_whole_string() {
        assert!(!match_pattern(PatternKind::Glob, "/tmp/*", "/tmp/a/b"));
        assert!(match_pattern(PatternKind::Glob, "/tmp/**", "/tmp/a/b"));
    }

    #[test]
    fn glob_tilde_expands() {
        if let Some(home) = std::env::var_os("HOME") {
            let path = format!("{}/notes/todo.md", home.to_string_lossy());
            assert!(match_pattern(PatternKind::Glob, "~/notes/*.md", &path));
            assert!(match_pattern(PatternKind::Glob, "~/notes/*.md", "~/notes/todo.md"));
        }
    }

    #[test]
    fn glob_invalid_never_matches() {
        assert!(!match_pattern(PatternKind::Glob, "a**b", "aXb"));
    }

    // ── Native mode ──

    #[test]
    fn native_exact_without_star() {
        assert!(match_pattern(PatternKind::Native, "git status", "git status"));
        assert!(!match_pattern(
            PatternKind::Native,
            "git status",
            "git status --short"
        ));
    }

    #[test]
    fn native_trailing_star() {
        assert!(match_pattern(PatternKind::Native, "git *", "git status"));
        assert!(match_pattern(PatternKind::Native, "git *", "git "));
        assert!(!match_pattern(PatternKind::Native, "git *", "got status"));
    }

    #[test]
    fn native_middle_star() {
        assert!(match_pattern(PatternKind::Native, "git * main", "git push origin main"));
        assert!(!match_pattern(
            PatternKind::Native,
            "git * main",
            "git push origin dev"
        ));
    }

    #[test]
    fn native_star_joins_within_word() {
        assert!(match_pattern(PatternKind::Native, "cat *log", "cat app.log"));
        assert!(!match_pattern(PatternKind::Native, "cat *log", "cat app.txt"));
    }

    #[test]
    fn native_anchors_first_segment() {
        assert!(!match_pattern(PatternKind::Native, "git *", "sudo git status"));
        assert!(match_pattern(PatternKind::Native, "*git *", "sudo git status"));
    }

    #[test]
    fn native_all_stars_match_anything() {
        assert!(match_pattern(PatternKind::Native, "***", "anything at all"));
        assert!(match_pattern(PatternKind::Native, "*", ""));
    }

    // ── Default-mode fnmatch helper ──

    #[test]
    fn fnmatch_star_crosses_everything() {
        assert!(fnmatch("git status --short", "git *"));
        assert!(fnmatch("cat /a/b/c", "cat *"));
        assert!(!fnmatch("gitx", "git *"));
    }

    #[test]
    fn fnmatch_question_mark() {
        assert!(fnmatch("ls -a", "ls -?"));
        assert!(!fnmatch("ls -al", "ls -?"));
    }

    #[test]
    fn fnmatch_literal_dots() {
        assert!(fnmatch("cat file.txt", "cat file.txt"));
        assert!(!fnmatch("cat fileXtxt", "cat file.txt"));
    }
}
