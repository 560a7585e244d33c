//! shellguard: PreToolUse hook for Claude Code.
//!
//! Reads JSON from stdin, writes a permission decision to stdout.
//!
//! - `Bash` tool calls are parsed and every extracted sub-command is
//!   checked against the `[commands]` allow/deny pattern lists.
//! - `Read`/`Write`/`Edit` tool calls have their file path checked against
//!   the `[files]` glob lists.
//! - Other tools pass through as allowed.

use serde::Deserialize;
use std::io::Read;

use shellguard::config::Config;
use shellguard::eval::{self, Decision, PermissionEngine, RuleMatch};
use shellguard::logging;

#[derive(Debug, Deserialize)]
struct HookInput {
    tool_name: Option<String>,
    tool_input: Option<ToolInput>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolInput {
    command: Option<String>,
    file_path: Option<String>,
}

/// Tools whose input is a file path rather than a command.
const FILE_PATH_TOOLS: &[&str] = &["Read", "Write", "Edit"];

/// Route one tool call to the right check.
///
/// Returns the log target plus the decision, or None when the hook has
/// nothing to say (empty command) and should exit without output.
fn decide(tool_name: &str, input: ToolInput, config: &Config) -> Option<(String, RuleMatch)> {
    if tool_name == "Bash" {
        let command = input.command.unwrap_or_default();
        if command.is_empty() {
            return None;
        }
        let engine = PermissionEngine::from_config(config);
        let result = engine.evaluate(&command);
        return Some((command, result));
    }

    if FILE_PATH_TOOLS.contains(&tool_name) {
        let Some(path) = input.file_path.filter(|p| !p.is_empty()) else {
            return Some((
                format!("{tool_name}()"),
                RuleMatch::new(Decision::Deny, "No file_path provided in tool input"),
            ));
        };
        let result = if config.files.allow.is_empty() {
            RuleMatch::new(
                Decision::Deny,
                format!("No {tool_name} permissions found in settings - all operations blocked"),
            )
        } else {
            eval::check_file_path(&path, &config.files.allow, &config.files.deny)
        };
        return Some((format!("{tool_name}({path})"), result));
    }

    Some((
        tool_name.to_string(),
        RuleMatch::new(Decision::Allow, format!("tool not governed: {tool_name}")),
    ))
}

fn main() {
    logging::init_debug_log();

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("failed to read stdin");
        std::process::exit(1);
    }

    let hook_input: HookInput = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("JSON parse error: {e}");
            std::process::exit(1);
        }
    };

    let Some(tool_name) = hook_input.tool_name else {
        std::process::exit(0);
    };
    let tool_input = hook_input.tool_input.unwrap_or_default();

    let config = Config::load();
    let Some((target, result)) = decide(&tool_name, tool_input, &config) else {
        std::process::exit(0);
    };

    if config.settings.log_decisions {
        logging::log_decision(&target, &result);
    }

    let output = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": result.decision.as_str(),
            "permissionDecisionReason": result.reason,
        }
    });

    println!("{}", serde_json::to_string(&output).unwrap());
}
