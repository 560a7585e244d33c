//! shellguard: a PreToolUse hook for Claude Code that gates Bash commands
//! with pattern-based permission rules.
//!
//! A command line is parsed by a memoized PEG grammar, split into every
//! individually-executable sub-command (pipelines, `&&`/`||`/`;` chains,
//! subshells, brace groups, command substitutions at any depth), and each
//! sub-command is matched against configured allow/deny patterns. The
//! strictest result wins: any denied sub-command denies the whole line,
//! and a command that matches nothing is denied (fail closed).
//!
//! # Architecture
//!
//! - **[`parse`]** — Grammar engine and sub-command extraction: PEG parser,
//!   syntax tree, tree walker with parse-failure fallback.
//! - **[`pattern`]** — Pattern classification (`[regex]`/`[glob]`/`[native]`
//!   prefixes) and the four matching modes, plus path normalization.
//! - **[`eval`]** — Permission engine: deny-first single checks,
//!   strictest-wins compound aggregation, file-path checks.
//! - **[`config`]** — Configuration loading: embedded defaults + user
//!   overlay merge.
//! - **[`logging`]** — Decision logging to
//!   `~/.local/share/shellguard/decisions.log`.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Permission engine: pattern-list evaluation and decision aggregation.
pub mod eval;
/// File-based decision logging and debug-log setup.
pub mod logging;
/// Command-line parsing: PEG grammar, syntax tree, command extraction.
pub mod parse;
/// Pattern modes, prefix classification, and path normalization.
pub mod pattern;

use eval::RuleMatch;

/// Evaluate a command string against the default configuration.
///
/// This is the main entry point for tests and simple usage.
/// For user config, build a [`eval::PermissionEngine`] from
/// [`config::Config::load`] instead.
pub fn evaluate(command: &str) -> RuleMatch {
    let config = config::Config::default_config();
    let engine = eval::PermissionEngine::from_config(&config);
    engine.evaluate(command)
}
