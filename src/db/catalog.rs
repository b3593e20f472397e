use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::queries;
use crate::error::SourceError;
use crate::models::{
    AncestorScope, Brand, CategoryNode, FieldOption, HierarchyLevel, SpecificationOutcome,
    Supplier, VariantField,
};
use crate::service::source::{HierarchySource, SpecificationSource};

/// 基于 PostgreSQL 的主数据目录
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HierarchySource for PgCatalog {
    async fn list_nodes(
        &self,
        level: HierarchyLevel,
        scope: Option<&AncestorScope>,
    ) -> Result<Vec<CategoryNode>, SourceError> {
        let nodes = queries::list_nodes(&self.pool, level, scope).await?;
        tracing::debug!("Loaded {} {} nodes (scope: {:?})", nodes.len(), level, scope);
        Ok(nodes)
    }

    async fn find_node(
        &self,
        level: HierarchyLevel,
        code: &str,
    ) -> Result<Option<CategoryNode>, SourceError> {
        Ok(queries::find_node(&self.pool, level, code).await?)
    }
}

#[async_trait]
impl SpecificationSource for PgCatalog {
    async fn fetch_specification(&self, category_code: &str) -> SpecificationOutcome {
        match queries::get_specification(&self.pool, category_code).await {
            Ok(Some(spec)) => SpecificationOutcome::Found(spec),
            Ok(None) => SpecificationOutcome::NotConfigured,
            Err(e) => {
                tracing::error!("Specification query for {} failed: {:?}", category_code, e);
                SpecificationOutcome::FetchError(e.to_string())
            }
        }
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, SourceError> {
        Ok(queries::list_suppliers(&self.pool).await?)
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, SourceError> {
        Ok(queries::list_brands(&self.pool).await?)
    }

    async fn list_field_options(&self, field: VariantField) -> Result<Vec<FieldOption>, SourceError> {
        let options: Vec<FieldOption> = match field {
            VariantField::Supplier => queries::list_suppliers(&self.pool)
                .await?
                .iter()
                .map(FieldOption::from)
                .collect(),
            VariantField::Brand => queries::list_brands(&self.pool)
                .await?
                .iter()
                .map(FieldOption::from)
                .collect(),
            _ => queries::list_master_options(&self.pool, field).await?,
        };
        tracing::debug!("Loaded {} {} options", options.len(), field.key());
        Ok(options)
    }
}
