use futures::try_join;
use std::sync::Arc;

use crate::error::SessionError;
use crate::models::{
    Brand, CategorySpecification, FetchErrorPolicy, FieldOption, FilteredCandidates, FormField,
    GroupMember, SpecificationOutcome, Supplier, VariantField, VariantFieldConfig,
};
use crate::service::source::SpecificationSource;

/// 按声明的分组过滤; 实体自身没有分组时在过滤生效后被排除
fn filter_dimension<T>(config: Option<&VariantFieldConfig>, all: &[T]) -> (Vec<T>, bool)
where
    T: GroupMember + Clone,
{
    let Some(allowed) = config.and_then(VariantFieldConfig::active_groups) else {
        return (all.to_vec(), false);
    };

    let kept = all
        .iter()
        .filter(|entity| {
            entity
                .groups()
                .iter()
                .any(|g| allowed.contains(g.as_str()))
        })
        .cloned()
        .collect();
    (kept, true)
}

/// 根据分类规格过滤供应商和品牌. spec 为 None 表示未配置
pub fn filter_candidates(
    spec: Option<&CategorySpecification>,
    all_suppliers: &[Supplier],
    all_brands: &[Brand],
) -> FilteredCandidates {
    let Some(spec) = spec else {
        return FilteredCandidates {
            suppliers: all_suppliers.to_vec(),
            brands: all_brands.to_vec(),
            has_filters: false,
        };
    };

    let (suppliers, suppliers_filtered) =
        filter_dimension(spec.specifications.supplier.as_ref(), all_suppliers);
    let (brands, brands_filtered) =
        filter_dimension(spec.specifications.brand.as_ref(), all_brands);

    FilteredCandidates {
        suppliers,
        brands,
        has_filters: suppliers_filtered || brands_filtered,
    }
}

/// 某个变体字段的下拉选项: 字段未配置或未启用时为空, 声明了分组时按分组过滤
pub fn field_options(
    spec: &CategorySpecification,
    field: VariantField,
    all: &[FieldOption],
) -> Vec<FieldOption> {
    match spec.specifications.field(field) {
        Some(config) if config.enabled => filter_dimension(Some(config), all).0,
        _ => Vec::new(),
    }
}

/// 表单要渲染的字段. 启用的变体字段排在前面 (display_order 0), 再按顺序号排自定义字段
pub fn form_fields(spec: &CategorySpecification) -> Vec<FormField> {
    let variants = VariantField::ALL.into_iter().filter_map(|field| {
        let config = spec.specifications.field(field).filter(|c| c.enabled)?;
        Some(FormField {
            field_key: field.key().to_string(),
            field_name: field.label().to_string(),
            field_type: "select".to_string(),
            required: config.required,
            groups: config.groups.clone(),
            options: Vec::new(),
            display_order: 0,
        })
    });
    let custom = spec
        .custom_fields
        .iter()
        .filter(|f| f.enabled)
        .map(|f| FormField {
            field_key: f.field_code.clone(),
            field_name: f.field_name.clone(),
            field_type: f.field_type.clone(),
            required: f.required,
            groups: Vec::new(),
            options: f.options.clone(),
            display_order: f.display_order,
        });

    let mut fields: Vec<FormField> = variants.chain(custom).collect();
    fields.sort_by_key(|f| f.display_order);
    fields
}

/// 按策略处理查询结果, 返回用于过滤的规格
pub fn apply_policy(
    category_code: &str,
    outcome: SpecificationOutcome,
    policy: FetchErrorPolicy,
) -> Result<Option<CategorySpecification>, SessionError> {
    match outcome {
        SpecificationOutcome::Found(spec) => Ok(Some(spec)),
        SpecificationOutcome::NotConfigured => {
            tracing::debug!("No specifications configured for {}", category_code);
            Ok(None)
        }
        SpecificationOutcome::FetchError(reason) => match policy {
            FetchErrorPolicy::Unfiltered => {
                tracing::warn!(
                    "Specification fetch for {} failed, falling back to unfiltered: {}",
                    category_code,
                    reason
                );
                Ok(None)
            }
            FetchErrorPolicy::Strict => Err(SessionError::SpecificationUnavailable {
                category_code: category_code.to_string(),
                reason,
            }),
        },
    }
}

/// 读取规格与全量供应商/品牌并过滤
pub struct SpecificationFilterService {
    source: Arc<dyn SpecificationSource>,
    policy: FetchErrorPolicy,
}

impl SpecificationFilterService {
    pub fn new(source: Arc<dyn SpecificationSource>, policy: FetchErrorPolicy) -> Self {
        Self { source, policy }
    }

    /// 按策略读取规格; None 表示未配置 (或失败后降级)
    async fn specification(
        &self,
        category_code: &str,
    ) -> Result<Option<CategorySpecification>, SessionError> {
        let outcome = self.source.fetch_specification(category_code).await;
        apply_policy(category_code, outcome, self.policy)
    }

    /// 分类的表单字段; 未配置规格时为 None
    pub async fn form_fields_for(
        &self,
        category_code: &str,
    ) -> Result<Option<Vec<FormField>>, SessionError> {
        Ok(self.specification(category_code).await?.map(|spec| form_fields(&spec)))
    }

    /// 分类下某字段的可选值; 未配置规格时为 None
    pub async fn field_values_for(
        &self,
        category_code: &str,
        field: VariantField,
    ) -> Result<Option<Vec<FieldOption>>, SessionError> {
        let Some(spec) = self.specification(category_code).await? else {
            return Ok(None);
        };
        let all = self.source.list_field_options(field).await?;
        let options = field_options(&spec, field, &all);
        tracing::debug!(
            "{} options for {}: {}/{}",
            field.key(),
            category_code,
            options.len(),
            all.len()
        );
        Ok(Some(options))
    }

    pub async fn candidates_for(&self, category_code: &str) -> Result<FilteredCandidates, SessionError> {
        let (suppliers, brands) =
            try_join!(self.source.list_suppliers(), self.source.list_brands())?;

        if category_code.is_empty() {
            return Ok(filter_candidates(None, &suppliers, &brands));
        }

        let spec = self.specification(category_code).await?;
        let filtered = filter_candidates(spec.as_ref(), &suppliers, &brands);

        tracing::info!(
            "Candidates for {}: {}/{} suppliers, {}/{} brands, filtered={}",
            category_code,
            filtered.suppliers.len(),
            suppliers.len(),
            filtered.brands.len(),
            brands.len(),
            filtered.has_filters
        );
        Ok(filtered)
    }
}
