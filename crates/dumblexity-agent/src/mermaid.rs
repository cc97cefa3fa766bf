use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static MERMAID_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```mermaid[ \t]*\r?\n(.*?)```").expect("valid regex")
});

/// Bodies of all ```` ```mermaid ```` fenced blocks, in order of appearance.
pub fn extract_mermaid_blocks(text: &str) -> Vec<String> {
    MERMAID_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
        .filter(|body| !body.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_blocks() {
        assert!(extract_mermaid_blocks("Plain answer with ```rust\nfn main() {}\n```").is_empty());
        assert!(extract_mermaid_blocks("").is_empty());
    }

    #[test]
    fn test_multiple_blocks_in_order() {
        let text = "Intro\n```mermaid\ngraph TD\n  A-->B\n```\nmiddle\n```mermaid \r\nsequenceDiagram\n  A->>B: hi\n```";
        let blocks = extract_mermaid_blocks(text);
        assert_eq!(blocks, vec!["graph TD\n  A-->B", "sequenceDiagram\n  A->>B: hi"]);
    }

    #[test]
    fn test_unterminated_block_is_ignored() {
        assert!(extract_mermaid_blocks("```mermaid\ngraph TD\n  A-->B").is_empty());
    }
}
