// Prompt template rendering
//
// `{name}` is replaced with the variable's value; `{{` and `}}` produce literal
// braces. Unknown placeholders are left as written so that JSON examples in a
// prompt survive rendering.

use std::collections::BTreeMap;

pub fn render(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            match placeholder(tail).and_then(|name| vars.get(name).map(|v| (name, v))) {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &tail[name.len() + 2..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Identifier between `{` and `}` at the start of `s`, if well-formed.
fn placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_substitutes_known_placeholders() {
        let out = render("Hi {agent_name}, style: {style}.", &vars(&[("agent_name", "Nova"), ("style", "lofi")]));
        assert_eq!(out, "Hi Nova, style: lofi.");
    }

    #[test]
    fn test_escaped_braces() {
        let out = render("Return {{\"title\": \"{topic}\"}}", &vars(&[("topic", "AI")]));
        assert_eq!(out, "Return {\"title\": \"AI\"}");
    }

    #[test]
    fn test_unknown_placeholder_left_alone() {
        let out = render("{missing} and { \"a\": 1 }", &vars(&[]));
        assert_eq!(out, "{missing} and { \"a\": 1 }");
    }

    #[test]
    fn test_values_are_not_re_expanded() {
        let out = render("{a}", &vars(&[("a", "{b}"), ("b", "nope")]));
        assert_eq!(out, "{b}");
    }
}
