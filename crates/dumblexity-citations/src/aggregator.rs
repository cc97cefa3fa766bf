use crate::citation_set::CitationSet;
use crate::resolver::ResolveUrls;
use dumblexity_core::{FunctionCallRecord, GroundingChunk};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

pub const WEB_HEADING: &str = "#### Web Citations";
pub const MAPS_HEADING: &str = "#### Map Citations";
pub const TOOLS_HEADING: &str = "#### Tool Citations";

/// Renders a turn's citations as markdown sections.
///
/// Output is empty when nothing was cited; otherwise each non-empty section
/// (web, maps, tools, in that order) starts with a blank-line separator and a
/// heading, followed by numbered `[title](url)` lines.
pub struct CitationAggregator {
    resolver: Arc<dyn ResolveUrls>,
}

impl CitationAggregator {
    pub fn new(resolver: Arc<dyn ResolveUrls>) -> Self {
        Self { resolver }
    }

    /// Collects and renders in one step.
    pub async fn aggregate(
        &self,
        chunks: &[GroundingChunk],
        records: &[FunctionCallRecord],
    ) -> String {
        self.render(&CitationSet::collect(chunks, records)).await
    }

    /// Renders a collected set. Web URIs are swapped for their resolved targets.
    pub async fn render(&self, citations: &CitationSet) -> String {
        let mut out = String::new();

        if !citations.web().is_empty() {
            let uris: Vec<String> = citations.web().keys().cloned().collect();
            let resolved = self.resolver.resolve_all(&uris).await;
            debug!(count = uris.len(), "Resolved web citations");
            let entries = citations.web().iter().enumerate().map(|(i, (uri, title))| {
                let target = resolved.get(i).map_or(uri.as_str(), String::as_str);
                (title.as_str(), target)
            });
            push_section(&mut out, WEB_HEADING, entries);
        }

        push_section(
            &mut out,
            MAPS_HEADING,
            citations.maps().iter().map(|(uri, title)| (title.as_str(), uri.as_str())),
        );
        push_section(
            &mut out,
            TOOLS_HEADING,
            citations.tools().iter().map(|(uri, title)| (title.as_str(), uri.as_str())),
        );

        out
    }
}

fn push_section<'a>(
    out: &mut String,
    heading: &str,
    entries: impl Iterator<Item = (&'a str, &'a str)>,
) {
    let mut entries = entries.peekable();
    if entries.peek().is_none() {
        return;
    }
    let _ = write!(out, "\n\n{heading}\n");
    for (i, (title, url)) in entries.enumerate() {
        let _ = writeln!(out, "{}. [{title}]({url})", i + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, String>);

    #[async_trait]
    impl ResolveUrls for MapResolver {
        async fn resolve_all(&self, urls: &[String]) -> Vec<String> {
            urls.iter()
                .map(|u| self.0.get(u).cloned().unwrap_or_else(|| u.clone()))
                .collect()
        }
    }

    fn aggregator(pairs: &[(&str, &str)]) -> CitationAggregator {
        let map = pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        CitationAggregator::new(Arc::new(MapResolver(map)))
    }

    #[tokio::test]
    async fn test_nothing_cited() {
        assert_eq!(aggregator(&[]).aggregate(&[], &[]).await, "");
    }

    #[tokio::test]
    async fn test_single_web_citation() {
        let out = aggregator(&[])
            .aggregate(&[GroundingChunk::web("https://a.example", "A")], &[])
            .await;
        assert_eq!(out, "\n\n#### Web Citations\n1. [A](https://a.example)\n");
    }

    #[tokio::test]
    async fn test_web_uris_are_resolved_maps_are_not() {
        let agg = aggregator(&[
            ("https://redirect.example/1", "https://final.example/page"),
            ("https://maps.example/p", "https://never.example"),
        ]);
        let out = agg
            .aggregate(
                &[
                    GroundingChunk::maps("https://maps.example/p", "Cafe"),
                    GroundingChunk::web("https://redirect.example/1", "Page"),
                ],
                &[],
            )
            .await;
        assert_eq!(
            out,
            "\n\n#### Web Citations\n1. [Page](https://final.example/page)\n\
             \n\n#### Map Citations\n1. [Cafe](https://maps.example/p)\n"
        );
    }

    #[tokio::test]
    async fn test_section_order_and_numbering() {
        let records = vec![FunctionCallRecord {
            name: "search_web".into(),
            args: serde_json::json!({}),
            response: serde_json::json!({"results": [
                {"url": "https://t1.example", "title": "T1"},
                {"url": "https://t2.example"}
            ]}),
        }];
        let out = aggregator(&[])
            .aggregate(
                &[
                    GroundingChunk::web("https://w1.example", "W1"),
                    GroundingChunk::web("https://w2.example", "W2"),
                ],
                &records,
            )
            .await;

        let web = out.find(WEB_HEADING).unwrap_or(usize::MAX);
        let tools = out.find(TOOLS_HEADING).unwrap_or(0);
        assert!(web < tools);
        assert!(!out.contains(MAPS_HEADING));
        assert!(out.contains("2. [W2](https://w2.example)\n"));
        assert!(out.contains("2. [https://t2.example](https://t2.example)\n"));
    }

    #[tokio::test]
    async fn test_idempotent() {
        let agg = aggregator(&[("https://r.example", "https://f.example")]);
        let chunks = vec![
            GroundingChunk::web("https://r.example", "R"),
            GroundingChunk::maps("https://m.example", "M"),
        ];
        let set = CitationSet::collect(&chunks, []);
        assert_eq!(agg.render(&set).await, agg.render(&set).await);
    }
}
