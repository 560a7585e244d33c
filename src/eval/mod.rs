//! Permission evaluation: deny-first matching of extracted sub-commands
//! against configured pattern lists, with strictest-wins aggregation.

pub mod decision;

pub use decision::{Decision, RuleMatch};

use crate::config::Config;
use crate::parse::extract_commands;
use crate::pattern::{self, PatternKind, normalize};

/// Allow/deny pattern lists plus matching options.
pub struct PermissionEngine {
    allow: Vec<String>,
    deny: Vec<String>,
    extended_syntax: bool,
}

impl PermissionEngine {
    pub fn new(allow: Vec<String>, deny: Vec<String>, extended_syntax: bool) -> Self {
        Self {
            allow,
            deny,
            extended_syntax,
        }
    }

    /// Build the engine from the `[commands]` pattern lists.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.commands.allow.clone(),
            config.commands.deny.clone(),
            config.settings.extended_syntax,
        )
    }

    /// First pattern in `patterns` that matches `command`, if any.
    ///
    /// Regex, glob, and native patterns are matched against the raw command
    /// only. Default patterns are tried against both the raw command and
    /// its path-normalized form, and get the extra default-mode handling:
    /// `**/<component>/**` path-component tests, `**` collapsed to `*`,
    /// and `cmd:args` splitting.
    fn match_command<'a>(&self, command: &str, patterns: &'a [String]) -> Option<&'a str> {
        let variants = [
            command.to_string(),
            normalize::normalize_command_candidate(command),
        ];

        for raw in patterns {
            let (kind, pattern) = pattern::parse_pattern(raw, self.extended_syntax);

            if matches!(
                kind,
                PatternKind::Regex | PatternKind::Glob | PatternKind::Native
            ) {
                if pattern::match_pattern(kind, pattern, command) {
                    return Some(raw);
                }
                continue;
            }

            // `**/<component>/**`: match a path segment in any argument.
            if let Some(component) = pattern
                .strip_prefix("**/")
                .and_then(|rest| rest.strip_suffix("/**"))
            {
                if contains_path_component(command, component) {
                    return Some(raw);
                }
                continue;
            }

            // fnmatch does not distinguish ** from *.
            let collapsed = pattern.replace("**", "*");

            if let Some((cmd_pattern, args_pattern)) = collapsed.split_once(':') {
                let cmd_pattern = cmd_pattern.trim();
                let args_pattern = args_pattern.trim();
                for candidate in &variants {
                    if matches!(args_pattern, "*" | "") {
                        // Bare-args pattern like `git log:*`: require the same
                        // base command, then prefix-match the command part.
                        let base = cmd_pattern.split_whitespace().next().unwrap_or("");
                        let same_base = candidate == base
                            || candidate.starts_with(&format!("{base} "));
                        if same_base && pattern::fnmatch(candidate, &format!("{cmd_pattern}*")) {
                            return Some(raw);
                        }
                    } else if pattern::fnmatch(candidate, &format!("{cmd_pattern} {args_pattern}"))
                    {
                        return Some(raw);
                    }
                }
            } else {
                for candidate in &variants {
                    if pattern::fnmatch(candidate, &collapsed) {
                        return Some(raw);
                    }
                }
            }
        }
        None
    }

    /// Check one (non-compound) command: deny first, then allow, else deny.
    pub fn check_single(&self, command: &str) -> RuleMatch {
        if !self.deny.is_empty()
            && let Some(p) = self.match_command(command, &self.deny)
        {
            return RuleMatch::new(Decision::Deny, format!("Command matches deny pattern: {p}"));
        }
        if let Some(p) = self.match_command(command, &self.allow) {
            return RuleMatch::new(Decision::Allow, format!("Command matches allow pattern: {p}"));
        }
        RuleMatch::new(Decision::Deny, "Command does not match any allow patterns")
    }

    /// Evaluate a full (possibly compound) command line.
    ///
    /// Every extracted sub-command must be allowed; any denial wins, then
    /// any approval requirement, and only a clean sweep allows the line.
    pub fn evaluate(&self, command_line: &str) -> RuleMatch {
        // An empty allow list blocks everything; say so before parsing,
        // rather than reporting a per-command pattern miss.
        if self.allow.is_empty() {
            return RuleMatch::new(
                Decision::Deny,
                "No Bash permissions found in settings - all commands blocked",
            );
        }

        let commands = extract_commands(command_line);

        if commands.is_empty() {
            return RuleMatch::new(Decision::Deny, "No valid commands found in command line");
        }
        if commands.len() == 1 {
            return self.check_single(&commands[0]);
        }

        let checked: Vec<(&String, RuleMatch)> = commands
            .iter()
            .map(|cmd| (cmd, self.check_single(cmd)))
            .collect();

        if let Some((cmd, result)) = checked.iter().find(|(_, r)| r.decision == Decision::Deny) {
            return RuleMatch::new(
                Decision::Deny,
                format!(
                    "Compound command contains denied sub-command: {cmd} ({})",
                    result.reason
                ),
            );
        }
        if let Some((cmd, result)) = checked.iter().find(|(_, r)| r.decision == Decision::Ask) {
            return RuleMatch::new(
                Decision::Ask,
                format!(
                    "Compound command contains sub-command requiring approval: {cmd} ({})",
                    result.reason
                ),
            );
        }
        RuleMatch::new(
            Decision::Allow,
            format!(
                "All {} sub-commands in compound command are allowed",
                commands.len()
            ),
        )
    }
}

/// Glob-mode check for a file path against `[files]` pattern lists.
/// Deny first, then allow, else deny.
pub fn check_file_path(path: &str, allow: &[String], deny: &[String]) -> RuleMatch {
    for p in deny {
        if pattern::match_pattern(PatternKind::Glob, p, path) {
            return RuleMatch::new(Decision::Deny, format!("File path matches deny pattern: {p}"));
        }
    }
    for p in allow {
        if pattern::match_pattern(PatternKind::Glob, p, path) {
            return RuleMatch::new(
                Decision::Allow,
                format!("File path matches allow pattern: {p}"),
            );
        }
    }
    RuleMatch::new(Decision::Deny, "File path does not match any allow patterns")
}

/// Does any argument of `command` contain `component` as a path segment?
fn contains_path_component(command: &str, component: &str) -> bool {
    let mut tokens = command.split_whitespace();
    if tokens.next().is_none() {
        return false;
    }
    tokens.any(|arg| arg.replace('\\', "/").split('/').any(|part| part == component))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(allow: &[&str], deny: &[&str]) -> PermissionEngine {
        PermissionEngine::new(
            allow.iter().map(|s| s.to_string()).collect(),
            deny.iter().map(|s| s.to_string()).collect(),
            true,
        )
    }

    // ── Single-command checks ──

    #[test]
    fn allow_by_wildcard() {
        let e = engine(&["git *"], &[]);
        let r = e.check_single("git status");
        assert_eq!(r.decision, Decision::Allow);
        assert_eq!(r.reason, "Command matches allow pattern: git *");
    }

    #[test]
    fn deny_wins_over_allow() {
        let e = engine(&["git *"], &["git push *"]);
        let r = e.check_single("git push origin main");
        assert_eq!(r.decision, Decision::Deny);
        assert_eq!(r.reason, "Command matches deny pattern: git push *");
    }

    #[test]
    fn fail_closed_without_match() {
        let e = engine(&["git *"], &[]);
        let r = e.check_single("curl https://example.com");
        assert_eq!(r.decision, Decision::Deny);
        assert_eq!(r.reason, "Command does not match any allow patterns");
    }

    #[test]
    fn fail_closed_with_no_patterns_at_all() {
        let e = engine(&[], &[]);
        assert_eq!(e.check_single("ls").decision, Decision::Deny);
    }

    #[test]
    fn empty_allow_list_blocks_before_evaluation() {
        let e = engine(&[], &["rm *"]);
        let r = e.evaluate("git status");
        assert_eq!(r.decision, Decision::Deny);
        assert_eq!(
            r.reason,
            "No Bash permissions found in settings - all commands blocked"
        );
    }

    #[test]
    fn colon_pattern_matches_bare_and_with_args() {
        let e = engine(&["git log:*"], &[]);
        assert_eq!(e.check_single("git log").decision, Decision::Allow);
        assert_eq!(e.check_single("git log --oneline").decision, Decision::Allow);
        assert_eq!(e.check_single("git push").decision, Decision::Deny);
    }

    #[test]
    fn colon_pattern_with_specific_args() {
        let e = engine(&["git checkout:main"], &[]);
        assert_eq!(e.check_single("git checkout main").decision, Decision::Allow);
        assert_eq!(e.check_single("git checkout dev").decision, Decision::Deny);
    }

    #[test]
    fn path_component_pattern() {
        let e = engine(&["cat *"], &["**/.env/**"]);
        assert_eq!(e.check_single("cat .env").decision, Decision::Deny);
        assert_eq!(e.check_single("cat config/.env").decision, Decision::Deny);
        assert_eq!(e.check_single("cat .env/local").decision, Decision::Deny);
        assert_eq!(e.check_single("cat .environment").decision, Decision::Allow);
    }

    #[test]
    fn normalized_variant_matches_dot_slash_pattern() {
        let e = engine(&["cat ./*"], &[]);
        assert_eq!(e.check_single("cat file.txt").decision, Decision::Allow);
    }

    #[test]
    fn regex_pattern_raw_candidate_only() {
        let e = engine(&["[regex]^git (status|log|diff)"], &[]);
        assert_eq!(e.check_single("git log --oneline").decision, Decision::Allow);
        assert_eq!(e.check_single("git push").decision, Decision::Deny);
    }

    #[test]
    fn native_pattern_routed_through_native_matcher() {
        let e = engine(&["[native]git * main"], &[]);
        assert_eq!(e.check_single("git push origin main").decision, Decision::Allow);
        assert_eq!(e.check_single("git push origin dev").decision, Decision::Deny);
    }

    #[test]
    fn double_star_collapses_for_fnmatch() {
        let e = engine(&["cat /tmp/**"], &[]);
        assert_eq!(e.check_single("cat /tmp/a/b/c").decision, Decision::Allow);
    }

    // ── Compound evaluation ──

    #[test]
    fn compound_all_allowed() {
        let e = engine(&["git *", "cat *", "grep *"], &[]);
        let r = e.evaluate("cat file | grep pattern");
        assert_eq!(r.decision, Decision::Allow);
        assert_eq!(r.reason, "All 2 sub-commands in compound command are allowed");
    }

    #[test]
    fn compound_denied_subcommand() {
        let e = engine(&["git *"], &["rm *"]);
        let r = e.evaluate("git status && rm -rf /");
        assert_eq!(r.decision, Decision::Deny);
        assert_eq!(
            r.reason,
            "Compound command contains denied sub-command: rm -rf / \
             (Command matches deny pattern: rm *)"
        );
    }

    #[test]
    fn compound_unmatched_subcommand_fails_closed() {
        let e = engine(&["git *"], &[]);
        let r = e.evaluate("git status && curl https://example.com");
        assert_eq!(r.decision, Decision::Deny);
        assert!(r.reason.contains("curl https://example.com"));
    }

    #[test]
    fn substitution_contents_are_checked() {
        let e = engine(&["echo *"], &["rm *"]);
        let r = e.evaluate("echo $(rm -rf /)");
        assert_eq!(r.decision, Decision::Deny);
        assert!(r.reason.contains("rm -rf /"));
    }

    #[test]
    fn subshell_contents_are_checked() {
        let e = engine(&["cd *", "cat *"], &["rm *"]);
        let r = e.evaluate("(cd /tmp && rm file)");
        assert_eq!(r.decision, Decision::Deny);
    }

    #[test]
    fn empty_line_denied() {
        let e = engine(&["git *"], &[]);
        let r = e.evaluate("");
        assert_eq!(r.decision, Decision::Deny);
        assert_eq!(r.reason, "No valid commands found in command line");
    }

    #[test]
    fn unparseable_line_checked_as_whole() {
        let e = engine(&["git *"], &[]);
        // Falls back to the raw line, which matches no allow pattern.
        assert_eq!(e.evaluate("(git status").decision, Decision::Deny);
    }

    #[test]
    fn single_command_uses_plain_reason() {
        let e = engine(&["ls *", "ls"], &[]);
        let r = e.evaluate("ls -la");
        assert_eq!(r.decision, Decision::Allow);
        assert_eq!(r.reason, "Command matches allow pattern: ls *");
    }

    // ── File paths ──

    #[test]
    fn file_path_glob_allow() {
        let allow = vec!["/tmp/**".to_string()];
        let r = check_file_path("/tmp/scratch/notes.txt", &allow, &[]);
        assert_eq!(r.decision, Decision::Allow);
    }

    #[test]
    fn file_path_deny_first() {
        let allow = vec!["/tmp/**".to_string()];
        let deny = vec!["**/secrets/**".to_string()];
        let r = check_file_path("/tmp/secrets/key.pem", &allow, &deny);
        assert_eq!(r.decision, Decision::Deny);
    }

    #[test]
    fn file_path_fails_closed() {
        let r = check_file_path("/etc/passwd", &["/tmp/**".to_string()], &[]);
        assert_eq!(r.decision, Decision::Deny);
        assert_eq!(r.reason, "File path does not match any allow patterns");
    }
}
