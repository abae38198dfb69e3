//! 抽取与修复模板

pub const EXTRACT_TEMPLATE: &str = r#"Given this data and a type description, return a valid, stringified JSON value representing an instance of the type.
Make sure the response is JUST the value. Not a variable or anything else.
Example:

Data: Hey my name is Colin.
Type:
{
  "name": "string"
}
Stringified JSON:
{
  "name": "Colin"
}

---

Notes:
- undefined and null are not valid json fields, instead, just leave out the field.
- convert date information to stringified iso date format for dates.
- optional, undefined or nullable fields in the response mean that you can skip them OR you can add them depending on the data.

---

Okay, here's the Data and the Type:
Data:
{{data}}

Type:
{{type}}

Stringified JSON:
"#;

pub const FIXER_TEMPLATE: &str = r#"The following is supposed to be a JSON value which is not parsing correctly.
Ensure the data is a valid JSON object or array.
Note: if there are newlines in strings in the object, they must be replaced with \n
Return the updated JSON value.

Input Data:
{{json}}
Required Type:
{{type}}
Response:
"#;

pub fn extract_prompt(data: &str, shape: &str) -> String {
    EXTRACT_TEMPLATE
        .replace("{{type}}", shape)
        .replace("{{data}}", data)
}

pub fn fixer_prompt(broken: &str, shape: &str) -> String {
    FIXER_TEMPLATE
        .replace("{{type}}", shape)
        .replace("{{json}}", broken)
}
