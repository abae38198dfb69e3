//! 动作解析：从补全文本中找出 `Action: Name[argument]` 行
//!
//! 名称只接受当前注册表中的名字（区分大小写）；取文本中第一个合法匹配。
//! 参数取到本行最后一个 `]` 为止（允许内含方括号），去掉首尾空白后再剥掉一层成对的双引号。
//! `Component: Name[argument]` 使用同一套规则。

/// 解析出的指令：名称与参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub argument: String,
}

pub const ACTION_LABEL: &str = "Action";
pub const COMPONENT_LABEL: &str = "Component";

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// 剥掉一层包住整个参数的双引号
fn strip_quotes(arg: &str) -> &str {
    if arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"') {
        &arg[1..arg.len() - 1]
    } else {
        arg
    }
}

/// 在 `rest`（紧跟在 `Label: ` 之后的文本）上尝试匹配 `Name[...]`
fn match_at<'a, S: AsRef<str>>(rest: &'a str, names: &[S]) -> Option<(usize, &'a str)> {
    for (idx, name) in names.iter().enumerate() {
        let name = name.as_ref();
        if name.is_empty() {
            continue;
        }
        let Some(after) = rest.strip_prefix(name) else {
            continue;
        };
        let Some(body) = after.strip_prefix('[') else {
            continue;
        };
        let line = match body.find(is_line_break) {
            Some(end) => &body[..end],
            None => body,
        };
        if let Some(close) = line.rfind(']') {
            return Some((idx, &line[..close]));
        }
    }
    None
}

/// 按 `label` 解析第一条指令；找不到返回 None
pub fn parse_directive<S: AsRef<str>>(text: &str, label: &str, names: &[S]) -> Option<Directive> {
    let marker = format!("{}: ", label);
    for (pos, _) in text.match_indices(&marker) {
        let rest = &text[pos + marker.len()..];
        if let Some((idx, raw)) = match_at(rest, names) {
            return Some(Directive {
                name: names[idx].as_ref().to_string(),
                argument: strip_quotes(raw.trim()).to_string(),
            });
        }
    }
    None
}

/// 解析 `Action: Name[argument]`
pub fn parse_action<S: AsRef<str>>(text: &str, tool_names: &[S]) -> Option<Directive> {
    parse_directive(text, ACTION_LABEL, tool_names)
}

/// 解析 `Component: Name[argument]`
pub fn parse_component<S: AsRef<str>>(text: &str, component_names: &[S]) -> Option<Directive> {
    parse_directive(text, COMPONENT_LABEL, component_names)
}
