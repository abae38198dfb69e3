//! Calculator：一次只做一个二元运算
//!
//! 支持 `a + b`、`a - b`、`a * b`、`a / b`、`a ^ b`、`a % b` 以及单个数字；
//! 除零、非法格式均为工具失败。

use async_trait::async_trait;

use crate::tools::Tool;

pub struct CalculatorTool;

const OPERATORS: [char; 6] = ['+', '-', '*', '/', '^', '%'];

fn parse_number(s: &str) -> Result<f64, String> {
    let s = s.trim();
    s.parse::<f64>()
        .map_err(|_| format!("Not a number: {:?}", s))
}

/// 在跳过首字符（允许负号）后查找第一个运算符
fn split_operation(expr: &str) -> Option<(&str, char, &str)> {
    let mut chars = expr.char_indices();
    chars.next();
    for (i, c) in chars {
        if OPERATORS.contains(&c) {
            let lhs = &expr[..i];
            // 科学计数法中的符号，如 1e-3
            if (c == '+' || c == '-') && lhs.trim_end().ends_with(['e', 'E']) {
                continue;
            }
            return Some((lhs, c, &expr[i + c.len_utf8()..]));
        }
    }
    None
}

pub fn evaluate(expr: &str) -> Result<f64, String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err("Empty expression".to_string());
    }
    let Some((lhs, op, rhs)) = split_operation(expr) else {
        return parse_number(expr);
    };
    let a = parse_number(lhs)?;
    let b = parse_number(rhs)?;
    let value = match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        '/' if b == 0.0 => return Err("Division by zero".to_string()),
        '/' => a / b,
        '%' if b == 0.0 => return Err("Division by zero".to_string()),
        '%' => a % b,
        '^' => a.powf(b),
        _ => return Err(format!("Unsupported operator: {}", op)),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Result is not finite: {}", expr))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "Calculator"
    }

    fn description(&self) -> &str {
        "This tool only supports one math operation at a time. You must split discrete operations into multiple actions based on their order of operations."
    }

    async fn invoke(&self, argument: &str) -> Result<String, String> {
        evaluate(argument).map(format_number)
    }
}
