//! Graph visualization renderers
//!
//! Read-only DOT and single-file HTML renderings of the active graph.

use mnemon_core::{Edge, EdgeType, Insight};

fn truncate_label(content: &str, max: usize) -> String {
    let escaped = content.replace('"', "'");
    if escaped.chars().count() <= max {
        escaped
    } else {
        let cut: String = escaped.chars().take(max).collect();
        format!("{cut}…")
    }
}

fn edge_color(edge_type: EdgeType) -> &'static str {
    match edge_type {
        EdgeType::Temporal => "steelblue",
        EdgeType::Entity => "forestgreen",
        EdgeType::Causal => "firebrick",
        EdgeType::Semantic => "purple",
    }
}

/// Graphviz DOT rendering of the active graph
pub fn render_dot(insights: &[Insight], edges: &[Edge]) -> String {
    let mut out = String::from("digraph mnemon {\n");
    out.push_str("  rankdir=LR;\n  node [shape=box, style=rounded, fontsize=10];\n");

    for insight in insights {
        out.push_str(&format!(
            "  \"{}\" [label=\"{}\", tooltip=\"{} (importance {})\"];\n",
            insight.id,
            truncate_label(&insight.content, 40),
            insight.category,
            insight.importance,
        ));
    }
    for edge in edges {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [color={}, penwidth={:.2}, label=\"{}\", fontsize=8];\n",
            edge.source_id,
            edge.target_id,
            edge_color(edge.edge_type),
            1.0 + 2.0 * edge.weight,
            edge.edge_type,
        ));
    }
    out.push_str("}\n");
    out
}

/// Self-contained HTML page with the graph embedded as JSON
pub fn render_html(insights: &[Insight], edges: &[Edge]) -> String {
    let nodes: Vec<serde_json::Value> = insights
        .iter()
        .map(|i| {
            serde_json::json!({
                "id": i.id,
                "label": truncate_label(&i.content, 60),
                "category": i.category,
                "importance": i.importance,
            })
        })
        .collect();
    let links: Vec<serde_json::Value> = edges
        .iter()
        .map(|e| {
            serde_json::json!({
                "source": e.source_id,
                "target": e.target_id,
                "type": e.edge_type,
                "weight": e.weight,
            })
        })
        .collect();
    let payload = serde_json::json!({"nodes": nodes, "links": links});

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>mnemon graph</title>
<style>
  body {{ font-family: sans-serif; margin: 1rem; }}
  ul {{ list-style: none; padding: 0; }}
  li {{ margin: 0.15rem 0; }}
  .temporal {{ color: steelblue; }}
  .entity {{ color: forestgreen; }}
  .causal {{ color: firebrick; }}
  .semantic {{ color: purple; }}
</style>
</head>
<body>
<h1>mnemon graph</h1>
<div id="summary"></div>
<h2>Edges</h2>
<ul id="edges"></ul>
<script id="graph-data" type="application/json">{payload}</script>
<script>
  const data = JSON.parse(document.getElementById("graph-data").textContent);
  const byId = Object.fromEntries(data.nodes.map(n => [n.id, n]));
  document.getElementById("summary").textContent =
    data.nodes.length + " insights, " + data.links.length + " edges";
  const list = document.getElementById("edges");
  for (const link of data.links) {{
    const li = document.createElement("li");
    li.className = link.type;
    const from = byId[link.source] ? byId[link.source].label : link.source;
    const to = byId[link.target] ? byId[link.target].label : link.target;
    li.textContent = `[${{link.type}} ${{link.weight.toFixed(2)}}] ${{from}} → ${{to}}`;
    list.appendChild(li);
  }}
</script>
</body>
</html>
"#
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_output_has_nodes_and_typed_edges() {
        let dot = render_dot(&[], &[]);
        assert!(dot.starts_with("digraph mnemon"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn labels_are_truncated_and_quote_safe() {
        let label = truncate_label(&"x".repeat(100), 10);
        assert!(label.chars().count() <= 11);
        assert!(!truncate_label("say \"hi\"", 20).contains('"'));
    }
}
