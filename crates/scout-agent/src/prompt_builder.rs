//! System prompt builder.
//!
//! Assembles an engine's system prompt from prioritized sections: base
//! prompt, goal, task instructions, tool descriptions, and free-form context.

/// Builds a complete system prompt for an engine run.
pub struct SystemPromptBuilder {
    sections: Vec<PromptSection>,
}

#[derive(Debug, Clone)]
struct PromptSection {
    heading: String,
    content: String,
    priority: u8, // 0 = highest
}

impl SystemPromptBuilder {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Add the base system prompt (always first).
    pub fn with_base(mut self, prompt: &str) -> Self {
        self.push("", prompt, 0);
        self
    }

    pub fn with_goal(mut self, goal: &str) -> Self {
        if !goal.is_empty() {
            self.push("Goal", goal, 1);
        }
        self
    }

    /// Add task-specific instructions.
    pub fn with_task(mut self, instructions: &str) -> Self {
        self.push("Task", instructions, 2);
        self
    }

    /// Add tool descriptions as a section.
    pub fn with_tools(mut self, tool_definitions: &[scout_tools::ToolDefinition]) -> Self {
        if !tool_definitions.is_empty() {
            let mut content = String::from("You have access to the following tools:\n\n");
            for tool in tool_definitions {
                content.push_str(&format!("- **{}**: {}\n", tool.name, tool.description));
            }
            self.push("Available Tools", &content, 3);
        }
        self
    }

    /// Add a named section after the tool list.
    pub fn with_section(mut self, heading: &str, content: &str) -> Self {
        self.push(heading, content, 4);
        self
    }

    fn push(&mut self, heading: &str, content: &str, priority: u8) {
        self.sections.push(PromptSection {
            heading: heading.to_string(),
            content: content.to_string(),
            priority,
        });
    }

    /// Build the final system prompt. Sections of equal priority keep
    /// insertion order.
    pub fn build(mut self) -> String {
        self.sections.sort_by_key(|s| s.priority);
        let mut parts = Vec::new();
        for section in &self.sections {
            if section.heading.is_empty() {
                parts.push(section.content.clone());
            } else {
                parts.push(format!("# {}\n\n{}", section.heading, section.content));
            }
        }
        parts.join("\n\n")
    }
}

impl Default for SystemPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_base_prompt_only() {
        let prompt = SystemPromptBuilder::new()
            .with_base("You are a research assistant.")
            .build();

        assert_eq!(prompt, "You are a research assistant.");
    }

    #[test]
    fn sections_ordered_by_priority() {
        let prompt = SystemPromptBuilder::new()
            .with_section("Report Template", "## Summary")
            .with_task("Write the report.")
            .with_base("You are a research assistant.")
            .with_goal("Explain the paper.")
            .build();

        assert!(prompt.starts_with("You are a research assistant."));
        let goal = prompt.find("# Goal").unwrap();
        let task = prompt.find("# Task").unwrap();
        let template = prompt.find("# Report Template").unwrap();
        assert!(goal < task && task < template);
    }

    #[test]
    fn empty_goal_is_skipped() {
        let prompt = SystemPromptBuilder::new()
            .with_base("Base.")
            .with_goal("")
            .build();
        assert!(!prompt.contains("# Goal"));
    }

    #[test]
    fn with_tools_lists_each_tool() {
        let tools = vec![
            scout_tools::ToolDefinition {
                name: "web_search".into(),
                description: "Search scholarly sources".into(),
                parameters: serde_json::json!({"type": "object"}),
            },
            scout_tools::ToolDefinition {
                name: "write_file".into(),
                description: "Write a file".into(),
                parameters: serde_json::json!({"type": "object"}),
            },
        ];
        let prompt = SystemPromptBuilder::new().with_tools(&tools).build();
        assert!(prompt.contains("# Available Tools"));
        assert!(prompt.contains("- **web_search**: Search scholarly sources"));
        assert!(prompt.contains("- **write_file**: Write a file"));
    }

    #[test]
    fn empty_tool_list_adds_nothing() {
        let prompt = SystemPromptBuilder::new().with_base("B").with_tools(&[]).build();
        assert_eq!(prompt, "B");
    }
}
