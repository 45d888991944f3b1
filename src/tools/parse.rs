/// Remove a surrounding markdown code fence (```lang ... ```), if any.
pub fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string (```python) on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim_end()
        .to_string()
}

/// Pull the first JSON object out of a model reply that may wrap it in prose
/// or a code fence.
pub fn extract_json(response: &str) -> Option<serde_json::Value> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_block() {
        let reply = "```python\nimport os\nprint(os.getcwd())\n```";
        assert_eq!(strip_code_fences(reply), "import os\nprint(os.getcwd())");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fences("  x = 1  "), "x = 1");
    }

    #[test]
    fn bare_fence_yields_empty() {
        assert_eq!(strip_code_fences("```"), "");
    }

    #[test]
    fn extracts_object_from_prose() {
        let reply = "Sure! Here is my verdict:\n```json\n{\"pass\": false, \"reasoning\": \"too vague\"}\n```";
        let value = extract_json(reply).unwrap();
        assert_eq!(value["pass"], false);
        assert_eq!(value["reasoning"], "too vague");
    }

    #[test]
    fn no_object_yields_none() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("} backwards {").is_none());
    }
}
