use std::collections::HashMap;

use crate::error::SourceError;
use crate::models::{CategoryNode, HierarchyLevel, SearchMatch};
use crate::service::resolver::PATH_SEPARATOR;
use crate::service::source::HierarchySource;

pub const DEFAULT_MIN_CHARS: usize = 2;
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// 跨五级按编码或名称搜索 (不区分大小写)
#[derive(Debug, Clone, Copy)]
pub struct HierarchySearch {
    min_chars: usize,
    max_results: usize,
}

impl Default for HierarchySearch {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHARS, DEFAULT_MAX_RESULTS)
    }
}

impl HierarchySearch {
    pub fn new(min_chars: usize, max_results: usize) -> Self {
        Self {
            min_chars,
            max_results,
        }
    }

    /// 任一层级加载失败时记录警告并返回空结果
    pub async fn search<S>(&self, source: &S, term: &str) -> Vec<SearchMatch>
    where
        S: HierarchySource + ?Sized,
    {
        let needle = term.trim().to_lowercase();
        if needle.chars().count() < self.min_chars {
            return Vec::new();
        }

        match self.collect(source, &needle).await {
            Ok(results) => {
                tracing::debug!("Hierarchy search '{}' matched {} nodes", term, results.len());
                results
            }
            Err(e) => {
                tracing::warn!("Hierarchy search '{}' failed: {}", term, e);
                Vec::new()
            }
        }
    }

    async fn collect<S>(&self, source: &S, needle: &str) -> Result<Vec<SearchMatch>, SourceError>
    where
        S: HierarchySource + ?Sized,
    {
        // 编码 -> 节点, 用于拼接路径
        let mut known: HashMap<(HierarchyLevel, String), CategoryNode> = HashMap::new();
        let mut results = Vec::new();

        for level in HierarchyLevel::ALL {
            let nodes = source.list_nodes(level, None).await?;
            for node in &nodes {
                known.insert((level, node.code.clone()), node.clone());
            }

            for node in nodes {
                if results.len() >= self.max_results {
                    break;
                }
                if node.code.to_lowercase().contains(needle)
                    || node.name.to_lowercase().contains(needle)
                {
                    let path = display_path(&node, &known);
                    results.push(SearchMatch { level, node, path });
                }
            }

            if results.len() >= self.max_results {
                break;
            }
        }

        Ok(results)
    }
}

fn display_path(node: &CategoryNode, known: &HashMap<(HierarchyLevel, String), CategoryNode>) -> String {
    let mut names = vec![node.name.clone()];
    let mut current = node;
    while let (Some(level), Some(code)) = (current.level.parent(), current.parent_code.as_ref()) {
        match known.get(&(level, code.clone())) {
            Some(parent) => {
                names.push(parent.name.clone());
                current = parent;
            }
            None => {
                names.push(code.clone());
                break;
            }
        }
    }
    names.reverse();
    names.join(PATH_SEPARATOR)
}
