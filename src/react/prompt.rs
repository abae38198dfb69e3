//! ReAct / Component 提示词模板与少样本示例
//!
//! 占位符 `{{tools}}`、`{{examples}}`、`{{components}}`、`{{toolNames}}` 只在引擎构造时替换一次。

/// 少样本示例：一次输入与对应的内部独白
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub input: String,
    pub response: String,
}

impl Example {
    pub fn new(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
        }
    }
}

pub const REACT_TEMPLATE: &str = "You are the internal Monologue of a Chat Assistant.
You run in a loop of Thought, Action, PAUSE, Observation.
At the end of the loop you output an Answer
Use Thought to describe your thoughts about the question you have been asked.
Use Action to run one of the actions available to you - then return PAUSE.
Observation will be the result of running those actions.

Tools:
{{tools}}

You should always reply with the following format:

{{examples}}

Rules:
- If you have received an Input from the user, you should reply with a Thought and an Action.
- If you have received an Observation from a tool, you should reply with a Thought and an Action.
- You should never reply with an Input.
";

pub const COMPONENT_TEMPLATE: &str = "You are the internal Monologue of a Chat Assistant.
You run in a loop of Thought, Action, Observation.
At the end of the loop you output an Answer
Use Thought to describe your thoughts about the question you have been asked.
Use Action to run one of the actions available to you.
Observation will be the result of running those actions.

You can use tools to collect the required information for responding to the user.

Tools:
{{tools}}

You have access to these components with which to respond:

Components:
{{components}}

Your internal monologue always takes the following format:

\"\"\"
Input: What the user needs or wants
Thought: you should always think about what to do
Action: the action to take, should be one of [{{toolNames}}]
Observation: the result of the action
... (this Thought/Action/Observation can repeat N times)
Thought: I can now reply to the user
Action: Finish[reply to the user]
Component: Component[Component Parameters]
\"\"\"

Example:
{{examples}}

Rules:
- If you have received an Input from the user, you should reply with a Thought and an Action.
- If you have received an Observation from a tool, you should reply with a Thought and an Action.
- If you are ready to respond to the user, you should reply with a Finish action and a Component
- You should never reply with an Input.
- You should never use a Component in an Action or Observation.
";

/// 默认示例：天气查询、年龄查询
pub fn default_examples() -> Vec<Example> {
    vec![
        Example::new(
            "Input: What is the weather like today?",
            "Thought: I should search for the weather\nAction: Search[weather today]",
        ),
        Example::new(
            "Input: How old is Barack Obama?",
            "Thought: I need to find Barack Obama's age\n\
             Action: Search[Barack Obama age]\n\
             Observation: Barack Obama is 60 years old\n\
             Thought: I can provide the user with the information\n\
             Action: Finish[Barack Obama is 60 years old]",
        ),
    ]
}

/// `- Name[description]`，每行一个
pub fn render_entries(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(name, description)| format!("- {}[{}]", name, description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `- <input>\n<response>`，每个示例一段
pub fn render_examples(examples: &[Example]) -> String {
    examples
        .iter()
        .map(|e| format!("- {}\n{}", e.input, e.response))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 逐个替换占位符 `{{key}}`
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{}}}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_entries() {
        let entries = vec![
            ("Finish".to_string(), "Return a response".to_string()),
            ("Search".to_string(), "a search engine".to_string()),
        ];
        assert_eq!(
            render_entries(&entries),
            "- Finish[Return a response]\n- Search[a search engine]"
        );
    }

    #[test]
    fn test_fill_replaces_every_placeholder() {
        let out = fill(
            REACT_TEMPLATE,
            &[("tools", "- Finish[x]"), ("examples", &render_examples(&default_examples()))],
        );
        assert!(out.contains("- Finish[x]"));
        assert!(out.contains("- Input: What is the weather like today?\nThought:"));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_component_template_placeholders() {
        let out = fill(
            COMPONENT_TEMPLATE,
            &[
                ("tools", "- Finish[x]"),
                ("components", "- Card[y]"),
                ("toolNames", "Finish, Search"),
                ("examples", ""),
            ],
        );
        assert!(out.contains("should be one of [Finish, Search]"));
        assert!(out.contains("- Card[y]"));
        assert!(!out.contains("{{"));
    }
}
