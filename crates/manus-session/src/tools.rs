//! Display metadata for tool invocations
//!
//! Tool families ("shell", "file", ...) and tool functions ("shell_exec",
//! ...) arrive as string tags. The registry maps each tag to a small
//! descriptor and is checked for completeness once at startup.

use crate::conversation::ToolInvocation;
use crate::error::{Error, Result};
use crate::locale::Catalog;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Sandbox home directory stripped from displayed file paths
static HOME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/home/ubuntu/").expect("valid home prefix pattern"));

/// Icon shown next to a tool family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolIcon {
    Shell,
    Edit,
    Browser,
    Search,
}

impl ToolIcon {
    /// Terminal glyph for the icon
    pub fn glyph(&self) -> &'static str {
        match self {
            ToolIcon::Shell => "$",
            ToolIcon::Edit => "✎",
            ToolIcon::Browser => "◎",
            ToolIcon::Search => "⌕",
        }
    }
}

/// Detail view able to show a tool family's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolView {
    Shell,
    File,
    Search,
    Browser,
}

/// How the headline argument is cleaned up for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRule {
    /// Shown as sent
    Plain,
    /// Leading sandbox home directory removed
    StripHomePrefix,
}

impl ArgRule {
    pub fn apply(&self, value: &str) -> String {
        match self {
            ArgRule::Plain => value.to_string(),
            ArgRule::StripHomePrefix => HOME_PREFIX.replace(value, "").into_owned(),
        }
    }
}

/// Descriptor for a tool family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDescriptor {
    /// Catalog key of the display name
    pub name_key: &'static str,
    pub icon: Option<ToolIcon>,
    pub view: Option<ToolView>,
}

/// Descriptor for a tool function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Catalog key of the action label
    pub label_key: &'static str,
    /// Argument shown next to the label
    pub headline_arg: &'static str,
    pub arg_rule: ArgRule,
}

/// Everything needed to display one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub icon: Option<ToolIcon>,
    pub name: String,
    pub function: String,
    pub function_arg: String,
    pub view: Option<ToolView>,
}

/// Registry of tool families and functions
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    families: BTreeMap<String, FamilyDescriptor>,
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl ToolRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every tool the backend exposes
    pub fn builtin() -> Self {
        use ArgRule::{Plain, StripHomePrefix};

        let mut registry = Self::new();

        registry.register_family("shell", "Terminal", Some(ToolIcon::Shell), Some(ToolView::Shell));
        registry.register_family("file", "File", Some(ToolIcon::Edit), Some(ToolView::File));
        registry.register_family("browser", "Browser", Some(ToolIcon::Browser), Some(ToolView::Browser));
        registry.register_family("search", "Search", Some(ToolIcon::Search), Some(ToolView::Search));
        registry.register_family("info", "Information", None, None);
        registry.register_family("message", "Message", None, None);

        let functions: [(&str, &str, &str, ArgRule); 25] = [
            ("shell_exec", "Executing command", "command", Plain),
            ("shell_view", "Viewing command output", "shell", Plain),
            ("shell_wait", "Waiting for command completion", "shell", Plain),
            ("shell_write_to_process", "Writing data to process", "input", Plain),
            ("shell_kill_process", "Terminating process", "shell", Plain),
            ("file_read", "Reading file", "file", StripHomePrefix),
            ("file_write", "Writing file", "file", StripHomePrefix),
            ("file_str_replace", "Replacing file content", "file", StripHomePrefix),
            ("file_find_in_content", "Searching file content", "file", StripHomePrefix),
            ("file_find_by_name", "Finding file", "path", Plain),
            ("browser_view", "Viewing webpage", "page", Plain),
            ("browser_navigate", "Navigating to webpage", "url", Plain),
            ("browser_restart", "Restarting browser", "url", Plain),
            ("browser_click", "Clicking element", "element", Plain),
            ("browser_input", "Entering text", "text", Plain),
            ("browser_move_mouse", "Moving mouse", "position", Plain),
            ("browser_press_key", "Pressing key", "key", Plain),
            ("browser_select_option", "Selecting option", "option", Plain),
            ("browser_scroll_up", "Scrolling up", "page", Plain),
            ("browser_scroll_down", "Scrolling down", "page", Plain),
            ("browser_console_exec", "Executing JS code", "code", Plain),
            ("browser_console_view", "Viewing console output", "console", Plain),
            ("info_search_web", "Searching web", "query", Plain),
            ("message_notify_user", "Sending notification", "message", Plain),
            ("message_ask_user", "Asking question", "question", Plain),
        ];
        for (function, label_key, headline_arg, arg_rule) in functions {
            registry.register_function(function, label_key, headline_arg, arg_rule);
        }

        registry
    }

    /// Add or replace a tool family
    pub fn register_family(
        &mut self,
        tag: &str,
        name_key: &'static str,
        icon: Option<ToolIcon>,
        view: Option<ToolView>,
    ) {
        self.families.insert(
            tag.to_string(),
            FamilyDescriptor {
                name_key,
                icon,
                view,
            },
        );
    }

    /// Add or replace a tool function
    pub fn register_function(
        &mut self,
        tag: &str,
        label_key: &'static str,
        headline_arg: &'static str,
        arg_rule: ArgRule,
    ) {
        self.functions.insert(
            tag.to_string(),
            FunctionDescriptor {
                label_key,
                headline_arg,
                arg_rule,
            },
        );
    }

    pub fn family(&self, tag: &str) -> Option<&FamilyDescriptor> {
        self.families.get(tag)
    }

    pub fn function(&self, tag: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(tag)
    }

    /// Check that every function belongs to a registered family and every
    /// label has a translation
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for (tag, family) in &self.families {
            if family.name_key.is_empty() {
                problems.push(format!("family '{}' has no display name", tag));
            } else if !Catalog::has_key(family.name_key) {
                problems.push(format!("family '{}' name '{}' is untranslated", tag, family.name_key));
            }
        }

        for (tag, function) in &self.functions {
            let family = tag.split('_').next().unwrap_or_default();
            if !self.families.contains_key(family) {
                problems.push(format!("function '{}' has no family '{}'", tag, family));
            }
            if function.headline_arg.is_empty() {
                problems.push(format!("function '{}' has no headline argument", tag));
            }
            if !Catalog::has_key(function.label_key) {
                problems.push(format!("function '{}' label '{}' is untranslated", tag, function.label_key));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Registry(problems.join("; ")))
        }
    }

    /// Derive display data for an invocation
    ///
    /// Unknown tags produce empty labels rather than an error.
    pub fn describe(&self, tool: &ToolInvocation, catalog: &Catalog) -> ToolInfo {
        let family = self.family(&tool.name);
        let function = self.function(&tool.function);

        let function_arg = function
            .and_then(|f| {
                tool.args
                    .get(f.headline_arg)
                    .map(|value| f.arg_rule.apply(&display_value(value)))
            })
            .unwrap_or_default();

        ToolInfo {
            icon: family.and_then(|f| f.icon),
            name: family
                .map(|f| catalog.t(f.name_key).to_string())
                .unwrap_or_default(),
            function: function
                .map(|f| catalog.t(f.label_key).to_string())
                .unwrap_or_default(),
            function_arg,
            view: family.and_then(|f| f.view),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use serde_json::json;

    fn invocation(name: &str, function: &str, args: Value) -> ToolInvocation {
        ToolInvocation {
            name: name.into(),
            function: function.into(),
            args: args.as_object().cloned().unwrap_or_default(),
            result: None,
            status: None,
            timestamp: 0,
        }
    }

    #[test]
    fn test_builtin_is_complete() {
        ToolRegistry::builtin().validate().unwrap();
    }

    #[test]
    fn test_validate_reports_orphan_function() {
        let mut registry = ToolRegistry::new();
        registry.register_function("vnc_connect", "Connecting", "host", ArgRule::Plain);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("vnc_connect"), "got: {}", err);
    }

    #[test]
    fn test_describe_shell_exec() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("shell", "shell_exec", json!({"command": "ls -la", "id": "s1"})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.icon, Some(ToolIcon::Shell));
        assert_eq!(info.name, "Terminal");
        assert_eq!(info.function, "Executing command");
        assert_eq!(info.function_arg, "ls -la");
        assert_eq!(info.view, Some(ToolView::Shell));
    }

    #[test]
    fn test_file_paths_lose_home_prefix() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("file", "file_write", json!({"file": "/home/ubuntu/notes/todo.md"})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.function_arg, "notes/todo.md");

        // Only a leading prefix is stripped
        let info = registry.describe(
            &invocation("file", "file_read", json!({"file": "/tmp/home/ubuntu/x"})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.function_arg, "/tmp/home/ubuntu/x");
    }

    #[test]
    fn test_path_arg_is_not_stripped() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("file", "file_find_by_name", json!({"path": "/home/ubuntu/src"})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.function_arg, "/home/ubuntu/src");
    }

    #[test]
    fn test_describe_localized() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("browser", "browser_navigate", json!({"url": "https://example.com"})),
            &Catalog::new(Locale::Zh),
        );
        assert_eq!(info.name, "浏览器");
        assert_eq!(info.function, "正在导航到网页");
        assert_eq!(info.function_arg, "https://example.com");
    }

    #[test]
    fn test_describe_unknown_tool() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("robot", "robot_dance", json!({})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.icon, None);
        assert_eq!(info.name, "");
        assert_eq!(info.function, "");
        assert_eq!(info.function_arg, "");
    }

    #[test]
    fn test_non_string_arg_is_rendered() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("browser", "browser_move_mouse", json!({"position": [10, 20]})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.function_arg, "[10,20]");
    }

    #[test]
    fn test_message_family_has_no_icon() {
        let registry = ToolRegistry::builtin();
        let info = registry.describe(
            &invocation("message", "message_notify_user", json!({"message": "hi"})),
            &Catalog::new(Locale::En),
        );
        assert_eq!(info.icon, None);
        assert_eq!(info.view, None);
        assert_eq!(info.name, "Message");
        assert_eq!(info.function_arg, "hi");
    }
}
