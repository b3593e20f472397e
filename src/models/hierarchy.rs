use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SelectionError;

/// 分类层级 (1-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Category,
    SubCategory,
    Division,
    Class,
    SubClass,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; 5] = [
        HierarchyLevel::Category,
        HierarchyLevel::SubCategory,
        HierarchyLevel::Division,
        HierarchyLevel::Class,
        HierarchyLevel::SubClass,
    ];

    /// 层级序号, 从 1 开始
    pub fn depth(self) -> u8 {
        match self {
            HierarchyLevel::Category => 1,
            HierarchyLevel::SubCategory => 2,
            HierarchyLevel::Division => 3,
            HierarchyLevel::Class => 4,
            HierarchyLevel::SubClass => 5,
        }
    }

    pub fn from_depth(depth: u8) -> Option<Self> {
        match depth {
            1 => Some(HierarchyLevel::Category),
            2 => Some(HierarchyLevel::SubCategory),
            3 => Some(HierarchyLevel::Division),
            4 => Some(HierarchyLevel::Class),
            5 => Some(HierarchyLevel::SubClass),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self.depth() as usize - 1
    }

    pub fn next(self) -> Option<Self> {
        Self::from_depth(self.depth() + 1)
    }

    pub fn parent(self) -> Option<Self> {
        Self::from_depth(self.depth() - 1)
    }

    /// 比当前层级更深的所有层级 (按顺序)
    pub fn descendants(self) -> impl Iterator<Item = HierarchyLevel> {
        Self::ALL.into_iter().filter(move |l| *l > self)
    }

    pub fn label(self) -> &'static str {
        match self {
            HierarchyLevel::Category => "Category",
            HierarchyLevel::SubCategory => "Sub-Category",
            HierarchyLevel::Division => "Division",
            HierarchyLevel::Class => "Class",
            HierarchyLevel::SubClass => "Sub-Class",
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} {}", self.depth(), self.label())
    }
}

/// 分类节点 (任意层级), 只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub level: HierarchyLevel,
    pub code: String,
    pub name: String,
    /// 上一层的编码, 第 1 层为空
    pub parent_code: Option<String>,
}

impl CategoryNode {
    pub fn new(
        level: HierarchyLevel,
        code: impl Into<String>,
        name: impl Into<String>,
        parent_code: Option<&str>,
    ) -> Self {
        Self {
            level,
            code: code.into(),
            name: name.into(),
            parent_code: parent_code.map(str::to_string),
        }
    }
}

/// 候选列表的查询范围: 某个祖先层级的编码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorScope {
    pub level: HierarchyLevel,
    pub code: String,
}

impl AncestorScope {
    pub fn new(level: HierarchyLevel, code: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
        }
    }

    pub fn of(node: &CategoryNode) -> Self {
        Self::new(node.level, node.code.clone())
    }
}

/// 五级选择状态. 不允许出现空洞: 第 N 层有值则 1..N-1 必有值
///
/// 序列化为自顶向下的已选节点列表, 反序列化时经过 `from_path` 校验.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CategoryNode>", into = "Vec<CategoryNode>")]
pub struct HierarchySelection {
    slots: [Option<CategoryNode>; 5],
}

impl HierarchySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序从上到下构建, 用于恢复已保存的选择
    pub fn from_path(nodes: Vec<CategoryNode>) -> Result<Self, SelectionError> {
        let mut selection = Self::new();
        for node in nodes {
            selection.select(node)?;
        }
        Ok(selection)
    }

    pub fn get(&self, level: HierarchyLevel) -> Option<&CategoryNode> {
        self.slots[level.index()].as_ref()
    }

    /// 在节点所在层级选中, 并清除所有更深层级
    pub fn select(&mut self, node: CategoryNode) -> Result<(), SelectionError> {
        let level = node.level;
        if let Some(parent_level) = level.parent() {
            let Some(parent) = self.get(parent_level) else {
                return Err(SelectionError::MissingAncestor {
                    level,
                    missing: parent_level,
                });
            };
            if node.parent_code.as_deref() != Some(parent.code.as_str()) {
                return Err(SelectionError::ParentMismatch {
                    code: node.code,
                    expected: parent.code.clone(),
                });
            }
        }

        self.clear_below(level);
        self.slots[level.index()] = Some(node);
        Ok(())
    }

    /// 清除该层级及以下
    pub fn clear_from(&mut self, level: HierarchyLevel) {
        self.slots[level.index()] = None;
        self.clear_below(level);
    }

    /// 清除该层级以下 (不含)
    pub fn clear_below(&mut self, level: HierarchyLevel) {
        for l in level.descendants() {
            self.slots[l.index()] = None;
        }
    }

    /// 最深的已选层级
    pub fn deepest(&self) -> Option<&CategoryNode> {
        self.slots.iter().rev().flatten().next()
    }

    pub fn selected(&self) -> impl Iterator<Item = &CategoryNode> {
        self.slots.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl TryFrom<Vec<CategoryNode>> for HierarchySelection {
    type Error = SelectionError;

    fn try_from(nodes: Vec<CategoryNode>) -> Result<Self, Self::Error> {
        Self::from_path(nodes)
    }
}

impl From<HierarchySelection> for Vec<CategoryNode> {
    fn from(selection: HierarchySelection) -> Self {
        selection.slots.into_iter().flatten().collect()
    }
}

/// 解析结果: 有效分类编码 + 路径
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHierarchy {
    pub effective_code: String,
    pub path: String,
}

/// 搜索命中项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub level: HierarchyLevel,
    pub node: CategoryNode,
    pub path: String,
}
