//! Plain-text rendering of conversation events

use manus_api::{FileView, ShellView, StepStatus, StreamEvent};
use manus_session::{
    Catalog, Conversation, Locale, Message, StepRecord, ToolInvocation, ToolRegistry,
    format_relative_time,
};

use crate::utils::{single_line, truncate_chars};

const ARG_WIDTH: usize = 80;
const RESULT_WIDTH: usize = 120;

fn step_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "○",
        StepStatus::Running => "◐",
        StepStatus::Completed => "●",
        StepStatus::Failed => "✗",
    }
}

/// Turns events and views into lines for the terminal
pub struct Renderer {
    registry: ToolRegistry,
    catalog: Catalog,
}

impl Renderer {
    pub fn new(registry: ToolRegistry, locale: Locale) -> Self {
        Self {
            registry,
            catalog: Catalog::new(locale),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.catalog = Catalog::new(locale);
    }

    /// One line (occasionally a short block) for an applied event
    pub fn event(&self, event: &StreamEvent) -> String {
        match event {
            StreamEvent::Message(m) => format!("» {}", m.content),
            StreamEvent::Step(s) => format!(
                "{} {}",
                step_marker(s.status),
                s.description.as_deref().unwrap_or(&s.id)
            ),
            StreamEvent::Plan(plan) => {
                let mut out = String::from("Plan:");
                for (i, step) in plan.steps.iter().enumerate() {
                    out.push_str(&format!(
                        "\n  {}. {} {}",
                        i + 1,
                        step_marker(step.status),
                        step.description.as_deref().unwrap_or(&step.id)
                    ));
                }
                out
            }
            StreamEvent::Tool(data) => self.tool(&ToolInvocation::from(data)),
            StreamEvent::Error(e) => format!("Error: {}", e.error),
            StreamEvent::Done(_) => format!("✓ {}", self.catalog.t("Task completed")),
            StreamEvent::Title(t) => format!("# {}", t.title),
        }
    }

    /// Describe a tool invocation
    pub fn tool(&self, tool: &ToolInvocation) -> String {
        let info = self.registry.describe(tool, &self.catalog);
        let glyph = info.icon.map(|i| i.glyph()).unwrap_or("·");
        let function = if info.function.is_empty() {
            tool.function.as_str()
        } else {
            info.function.as_str()
        };

        let mut line = format!("  {} {}", glyph, function);
        if !info.function_arg.is_empty() {
            line.push(' ');
            line.push_str(&truncate_chars(&single_line(&info.function_arg), ARG_WIDTH));
        }
        if let Some(result) = &tool.result {
            let text = match result {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            line.push_str(" → ");
            line.push_str(&truncate_chars(&single_line(&text), RESULT_WIDTH));
        }
        line
    }

    fn step(&self, step: &StepRecord) -> String {
        let mut out = format!("{} {}", step_marker(step.status), step.description);
        for tool in &step.tools {
            out.push('\n');
            out.push_str(&self.tool(tool));
        }
        out
    }

    /// The whole conversation, each entry stamped with its age
    pub fn history(&self, conversation: &Conversation, now: i64) -> String {
        let mut lines = Vec::new();
        if let Some(title) = &conversation.title {
            lines.push(format!("# {}", title));
        }
        for message in &conversation.messages {
            let age = format_relative_time(message.timestamp(), now, &self.catalog);
            let body = match message {
                Message::User(m) => format!("> {}", m.content),
                Message::Assistant(m) if m.is_error => format!("Error: {}", m.content),
                Message::Assistant(m) => format!("» {}", m.content),
                Message::Tool(t) => self.tool(t),
                Message::Step(s) => self.step(s),
            };
            lines.push(format!("[{}] {}", age, body));
        }
        if lines.is_empty() {
            return self.catalog.t("New conversation").to_string();
        }
        lines.join("\n")
    }

    pub fn shell_view(&self, view: &ShellView) -> String {
        if view.console.is_empty() {
            return view.output.clone();
        }
        view.console
            .iter()
            .map(|record| format!("{} {}\n{}", record.ps1, record.command, record.output))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn file_view(&self, view: &FileView) -> String {
        format!("── {} ──\n{}", view.file, view.content)
    }
}
