pub mod llm_instructions;

/// Extracts the JSON body of a model completion.
///
/// Models often wrap JSON in a fenced code block (optionally tagged `json`);
/// the fence is stripped when present, otherwise the trimmed text is returned.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = trimmed.get(start.saturating_add(3)..).unwrap_or_default();
    let body = after_open
        .strip_prefix("json")
        .or_else(|| after_open.strip_prefix("JSON"))
        .unwrap_or(after_open);

    match body.find("```") {
        Some(end) => body.get(..end).unwrap_or(body).trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::strip_code_fence;

    #[test]
    fn strips_tagged_and_untagged_fences() {
        assert_eq!(
            strip_code_fence("```json\n{\"questions\": []}\n```"),
            "{\"questions\": []}"
        );
        assert_eq!(strip_code_fence("Sure!\n```{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_keeps_remaining_body() {
        assert_eq!(strip_code_fence("```json\n[1, 2]"), "[1, 2]");
    }
}
