//! Placeholder substitution for playbook action templates.
//!
//! Templates carry `{placeholder}` tokens (`{companyName}`, `{riskScore}`,
//! `{milestones}`, ...). Unknown placeholders are left verbatim so a typo in
//! a playbook definition is visible in the resulting task rather than
//! silently blanked.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-zA-Z][a-zA-Z0-9_]*)\}").unwrap())
}

pub fn render(template: &str, context: &HashMap<&'static str, String>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            match context.get(key) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HashMap<&'static str, String> {
        let mut ctx = HashMap::new();
        ctx.insert("companyName", "Acme Fleet".to_string());
        ctx.insert("riskScore", "22".to_string());
        ctx.insert("milestones", "first_booking, team_invited".to_string());
        ctx
    }

    #[test]
    fn test_substitutes_known_placeholders() {
        let out = render("Check in with {companyName} (score {riskScore})", &context());
        assert_eq!(out, "Check in with Acme Fleet (score 22)");
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let out = render("Escalate {companyName} via {channel}", &context());
        assert_eq!(out, "Escalate Acme Fleet via {channel}");
    }

    #[test]
    fn test_milestone_list() {
        let out = render("Overdue: {milestones}", &context());
        assert_eq!(out, "Overdue: first_booking, team_invited");
    }

    #[test]
    fn test_template_without_placeholders_unchanged() {
        let out = render("Plain title", &context());
        assert_eq!(out, "Plain title");
    }
}
