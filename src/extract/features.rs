//! Assembles the positional feature record for one comment from the
//! two per-file indexes.
use crate::index::source::SourceIndex;
use crate::index::span::{NodeId, SpanIndex};
use crate::index::IndexError;
use crate::record::FeatureSet;

/// One comment's position in the tree, as handed to the extractor.
#[derive(Debug, Clone, Copy)]
pub struct CommentSite {
    /// The comment's own node in the span index.
    pub node: NodeId,
    /// Raw node span, delimiters included.
    pub start: usize,
    pub end: usize,
}

/// Derives feature records for the comments of one file, in document
/// order. Tracks the previously processed comment so consecutive
/// comments can be related by distance.
pub struct FeatureExtractor<'a> {
    spans: &'a SpanIndex,
    source: &'a SourceIndex,
    tab_width: usize,
    prev: Option<CommentSite>,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(spans: &'a SpanIndex, source: &'a SourceIndex, tab_width: usize) -> Self {
        Self {
            spans,
            source,
            tab_width,
            prev: None,
        }
    }

    /// Build the feature set for one comment. `type_name` is the
    /// normalized comment kind recorded as the `type` feature.
    pub fn features_for(
        &mut self,
        site: CommentSite,
        type_name: &str,
    ) -> Result<FeatureSet, IndexError> {
        let mut feats = FeatureSet::new();
        feats.set("type", type_name);
        feats.set("line", self.source.line_of(site.start)?);

        if let Some(ids) = self.spans.nodes_ending_at_or_before(site.start) {
            let sorted = self.sorted_by_extent(ids);
            feats.set("leftTypes", self.joined_kinds(&sorted));
            let first = self.spans.node(sorted[0]);
            feats.set("leftLine", self.source.line_of(first.end)?);
        }

        if let Some(ids) = self.spans.nodes_starting_at_or_after(site.end) {
            let sorted = self.sorted_by_extent(ids);
            feats.set("rightTypes", self.joined_kinds(&sorted));
            let first = self.spans.node(sorted[0]);
            feats.set("rightLine", self.source.line_of(first.start)?);
        }

        match self.spans.enclosing_node(site.start, site.end, Some(site.node)) {
            Ok(parent) => {
                let chain: Vec<&str> = self
                    .spans
                    .ancestor_chain(parent.id)
                    .iter()
                    .map(|n| n.kind.as_str())
                    .collect();
                feats.set("parentTypes", chain.join(","));
                feats.set("parentStart", parent.start == site.start);
                feats.set("parentEnd", parent.end == site.end);
            }
            // Degenerate tree (the comment is the only node): the
            // parent features are simply absent.
            Err(IndexError::NoEnclosingNode { .. }) => {}
            Err(e) => return Err(e),
        }

        feats.set("cols", self.source.column_of(site.start, self.tab_width)?);

        if let Some(prev) = self.prev {
            feats.set("prevLine", self.source.line_of(prev.end)?);
            feats.set("prevCols", self.source.column_of(prev.start, self.tab_width)?);
        }
        self.prev = Some(site);

        Ok(feats)
    }

    /// Shortest-extent-first order over an equal-offset node set; the
    /// ingestion-order id breaks extent ties, keeping results stable
    /// across runs.
    fn sorted_by_extent(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut sorted = ids.to_vec();
        sorted.sort_by_key(|&id| (self.spans.node(id).extent(), id));
        sorted
    }

    fn joined_kinds(&self, ids: &[NodeId]) -> String {
        ids.iter()
            .map(|&id| self.spans.node(id).kind.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}
