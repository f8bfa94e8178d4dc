#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Query, QueryCursor, StreamingIterator, Tree};

/// One query match: capture name to captured source text.
pub type Captures = HashMap<String, String>;

/// Returns the compiled tree-sitter Java language.
fn java_language() -> tree_sitter::Language {
    tree_sitter_java::LANGUAGE.into()
}

/// Java source text together with its syntax tree.
pub struct SourceTree<'a> {
    /// the source code that was parsed
    code: &'a str,
    /// the parse tree
    tree: Tree,
    /// the tree-sitter java grammar language
    lang: tree_sitter::Language,
}

impl<'a> SourceTree<'a> {
    /// Parses `code` as Java.
    pub fn parse(code: &'a str) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let lang = java_language();

        parser
            .set_language(&lang)
            .with_context(|| "Failed to load Java grammar")?;
        let tree = parser
            .parse(code, None)
            .ok_or_else(|| anyhow!("Error parsing Java code"))?;

        Ok(Self { code, tree, lang })
    }

    /// Applies a tree-sitter query and returns every match as a map of
    /// capture names to text.
    pub fn query(&self, q: &str) -> Result<Vec<Captures>> {
        let query = Query::new(&self.lang, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let names: Vec<String> = query
            .capture_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, self.tree.root_node(), self.code.as_bytes());
        let mut results = vec![];

        while let Some(m) = matches.next() {
            let mut result = Captures::new();
            for capture in m.captures {
                let Some(name) = names.get(capture.index as usize) else {
                    continue;
                };
                let text = capture
                    .node
                    .utf8_text(self.code.as_bytes())
                    .with_context(|| format!("Cannot map capture {name} to source text"))?;
                result.insert(name.clone(), text.to_string());
            }
            results.push(result);
        }

        Ok(results)
    }
}
