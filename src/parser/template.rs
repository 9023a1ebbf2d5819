use anyhow::{Result, anyhow};
use std::collections::HashMap;
use regex::Regex;

/// Render `{{name}}` placeholders
/// template: "https://idp/tokens/{{template}}"
/// ctx: { "template" => "backend" }
pub fn render_template(template: &str, ctx: &HashMap<&str, &str>) -> Result<String> {
    let re = Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*\}\}")?;

    let mut missing: Vec<String> = Vec::new();
    let result = re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match ctx.get(name) {
            Some(val) => (*val).to_owned(),
            None => {
                missing.push(name.to_owned());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(anyhow!("Template '{}' contains unresolved placeholders: {:?}", template, missing));
    }

    Ok(result.into_owned())
}
