//! Lexical path normalization feeding default-mode pattern candidates.
//!
//! Commands are matched both as written and with their path arguments
//! rewritten to a canonical form: repeated leading slashes collapsed,
//! paths under `$HOME` shown as `~/...`, and bare relative paths given a
//! `./` prefix. Everything here is string rewriting; the filesystem is
//! never consulted.

/// Normalize a single path-like token.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    // Collapse repeated leading slashes.
    let mut path = if path.starts_with("//") {
        let trimmed = path.trim_start_matches('/');
        format!("/{trimmed}")
    } else {
        path.to_string()
    };

    // Rewrite paths under the home directory to ~/...
    if let Ok(home) = std::env::var("HOME")
        && !home.is_empty()
        && path.starts_with(&home)
    {
        let rest = &path[home.len()..];
        if rest.is_empty() {
            path = "~".to_string();
        } else if rest.starts_with('/') {
            path = format!("~{rest}");
        }
    }

    // Bare relative paths get an explicit ./ prefix.
    if !path.starts_with(['/', '~', '.']) {
        path = format!("./{path}");
    }

    path
}

/// Is this token worth normalizing as a path?
///
/// Contains a separator, starts with `~` or `.`, or ends in what looks
/// like a short file extension. Plain words are left alone to avoid
/// rewriting ordinary arguments.
fn looks_like_path(token: &str) -> bool {
    if token.contains('/') || token.starts_with('~') || token.starts_with('.') {
        return true;
    }
    if let Some((stem, ext)) = token.rsplit_once('.') {
        return !stem.is_empty()
            && !ext.is_empty()
            && ext.len() <= 4
            && ext.chars().all(|c| c.is_ascii_alphanumeric());
    }
    false
}

/// Normalize path-like tokens within a command string. The command word
/// itself and `-` flags are never touched.
pub fn normalize_command(command: &str) -> String {
    if command.is_empty() {
        return String::new();
    }
    let mut tokens: Vec<String> = Vec::new();
    for (i, token) in command.split_whitespace().enumerate() {
        if i == 0 || token.starts_with('-') || !looks_like_path(token) {
            tokens.push(token.to_string());
        } else {
            tokens.push(normalize_path(token));
        }
    }
    tokens.join(" ")
}

/// The normalized candidate used alongside the raw command in default-mode
/// matching. On top of [`normalize_command`], an argument tail that does
/// not start with `.`, `/`, `-`, or `~` gains a `./` prefix, so `ls mydir`
/// can match `ls ./*` style patterns.
pub fn normalize_command_candidate(command: &str) -> String {
    let result = normalize_command(command);
    if let Some((cmd, args)) = result.split_once(' ')
        && !args.is_empty()
        && !args.starts_with(['.', '/', '-', '~'])
    {
        return format!("{cmd} ./{args}");
    }
    result
}
