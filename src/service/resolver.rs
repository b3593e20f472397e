use serde::Serialize;

use crate::error::{SelectionError, SourceError};
use crate::models::{AncestorScope, CategoryNode, HierarchyLevel, HierarchySelection, ResolvedHierarchy};
use crate::service::source::HierarchySource;

pub const PATH_SEPARATOR: &str = " > ";

/// 计算有效分类编码 (最深层级) 与路径
pub fn resolve(selection: &HierarchySelection) -> ResolvedHierarchy {
    let effective_code = selection
        .deepest()
        .map(|n| n.code.clone())
        .unwrap_or_default();
    let path = selection
        .selected()
        .map(|n| n.name.as_str())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR);

    ResolvedHierarchy {
        effective_code,
        path,
    }
}

/// 需要加载的候选列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRequest {
    pub level: HierarchyLevel,
    pub scope: AncestorScope,
}

/// 单行明细的五级级联状态: 已选节点 + 每层候选列表
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchyCascade {
    selection: HierarchySelection,
    candidates: [Vec<CategoryNode>; 5],
}

impl HierarchyCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以第 1 层候选初始化
    pub fn with_categories(categories: Vec<CategoryNode>) -> Self {
        let mut cascade = Self::new();
        cascade.set_candidates(HierarchyLevel::Category, categories);
        cascade
    }

    pub fn selection(&self) -> &HierarchySelection {
        &self.selection
    }

    pub fn selected(&self, level: HierarchyLevel) -> Option<&CategoryNode> {
        self.selection.get(level)
    }

    pub fn candidates(&self, level: HierarchyLevel) -> &[CategoryNode] {
        &self.candidates[level.depth() as usize - 1]
    }

    pub fn set_candidates(&mut self, level: HierarchyLevel, nodes: Vec<CategoryNode>) {
        self.candidates[level.depth() as usize - 1] = nodes;
    }

    /// 选中节点: 清除更深层级的选择和候选, 返回下一层需要加载的候选
    pub fn select(&mut self, node: CategoryNode) -> Result<Option<CandidateRequest>, SelectionError> {
        let level = node.level;
        let scope = AncestorScope::of(&node);
        self.selection.select(node)?;
        for l in level.descendants() {
            self.candidates[l.depth() as usize - 1].clear();
        }

        Ok(level.next().map(|next| CandidateRequest { level: next, scope }))
    }

    /// 清空某层级及以下的选择, 保留该层候选
    pub fn clear_from(&mut self, level: HierarchyLevel) {
        self.selection.clear_from(level);
        for l in level.descendants() {
            self.candidates[l.depth() as usize - 1].clear();
        }
    }

    pub fn resolve(&self) -> ResolvedHierarchy {
        resolve(&self.selection)
    }

    pub fn effective_code(&self) -> String {
        self.resolve().effective_code
    }
}

/// 加载候选, 失败时记录警告并返回空列表
pub async fn load_candidates<S>(source: &S, level: HierarchyLevel, scope: Option<&AncestorScope>) -> Vec<CategoryNode>
where
    S: HierarchySource + ?Sized,
{
    match source.list_nodes(level, scope).await {
        Ok(nodes) => nodes,
        Err(e) => {
            log_fetch_failure(level, scope, &e);
            Vec::new()
        }
    }
}

pub(crate) fn log_fetch_failure(level: HierarchyLevel, scope: Option<&AncestorScope>, err: &SourceError) {
    match scope {
        Some(scope) => tracing::warn!(
            "Failed to load {} candidates under {} {}: {}",
            level,
            scope.level,
            scope.code,
            err
        ),
        None => tracing::warn!("Failed to load {} candidates: {}", level, err),
    }
}

/// 搜索回填结果
#[derive(Debug, Clone, PartialEq)]
pub struct Backfill {
    pub cascade: HierarchyCascade,
    pub target: HierarchyLevel,
    /// 实际选中的最深层级
    pub reached: Option<HierarchyLevel>,
}

impl Backfill {
    pub fn is_complete(&self) -> bool {
        self.reached == Some(self.target)
    }
}

/// 从下往上按编码定位所有祖先, 返回自顶向下的链
async fn locate_chain<S>(source: &S, target: &CategoryNode) -> Result<Vec<CategoryNode>, SelectionError>
where
    S: HierarchySource + ?Sized,
{
    let mut chain = vec![target.clone()];
    let mut current = target.clone();

    while let Some(parent_level) = current.level.parent() {
        let Some(code) = current.parent_code.clone() else {
            return Err(SelectionError::AncestorNotFound {
                level: parent_level,
                code: String::new(),
            });
        };

        let parent = match source.find_node(parent_level, &code).await {
            Ok(Some(node)) => node,
            Ok(None) => {
                return Err(SelectionError::AncestorNotFound {
                    level: parent_level,
                    code,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to locate {} {}: {}", parent_level, code, e);
                return Err(SelectionError::AncestorNotFound {
                    level: parent_level,
                    code,
                });
            }
        };

        chain.push(parent.clone());
        current = parent;
    }

    chain.reverse();
    Ok(chain)
}

/// 搜索命中后回填: 祖先自动选中, 命中节点在其层级选中, 更深层级只加载候选
pub async fn backfill<S>(source: &S, target: &CategoryNode) -> Result<Backfill, SelectionError>
where
    S: HierarchySource + ?Sized,
{
    let chain = locate_chain(source, target).await?;

    let mut cascade =
        HierarchyCascade::with_categories(load_candidates(source, HierarchyLevel::Category, None).await);
    let mut reached = None;

    for node in &chain {
        let found = cascade
            .candidates(node.level)
            .iter()
            .find(|c| c.code == node.code)
            .cloned();
        let Some(found) = found else {
            tracing::warn!(
                "{} {} missing from candidate list, stopping backfill at {:?}",
                node.level,
                node.code,
                reached
            );
            return Ok(Backfill {
                cascade,
                target: target.level,
                reached,
            });
        };

        if let Some(request) = cascade.select(found)? {
            if node.level < target.level {
                let nodes = load_candidates(source, request.level, Some(&request.scope)).await;
                cascade.set_candidates(request.level, nodes);
            }
        }
        reached = Some(node.level);
    }

    // 命中层级以下: 仅加载候选, 范围为命中节点的子树
    let scope = AncestorScope::of(target);
    for level in target.level.descendants() {
        let nodes = load_candidates(source, level, Some(&scope)).await;
        cascade.set_candidates(level, nodes);
    }

    tracing::debug!("Backfilled {} ({})", target.code, cascade.resolve().path);
    Ok(Backfill {
        cascade,
        target: target.level,
        reached,
    })
}
