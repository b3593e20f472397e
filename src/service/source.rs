use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::{
    AncestorScope, Brand, CategoryNode, FieldOption, HierarchyLevel, SpecificationOutcome, Supplier,
    VariantField,
};

/// 分类层级读取接口 (只返回启用的节点, 按排序号)
#[async_trait]
pub trait HierarchySource: Send + Sync {
    /// 某层级的候选节点; scope 为 None 时返回该层级全部节点
    async fn list_nodes(
        &self,
        level: HierarchyLevel,
        scope: Option<&AncestorScope>,
    ) -> Result<Vec<CategoryNode>, SourceError>;

    async fn find_node(
        &self,
        level: HierarchyLevel,
        code: &str,
    ) -> Result<Option<CategoryNode>, SourceError>;
}

/// 规格与供应商/品牌读取接口
#[async_trait]
pub trait SpecificationSource: Send + Sync {
    async fn fetch_specification(&self, category_code: &str) -> SpecificationOutcome;

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, SourceError>;

    async fn list_brands(&self) -> Result<Vec<Brand>, SourceError>;

    /// 变体字段的全部启用选项, 尚未按分组过滤
    async fn list_field_options(&self, field: VariantField) -> Result<Vec<FieldOption>, SourceError>;
}
