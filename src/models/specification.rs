use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// 变体字段配置 (颜色/尺码/单位/供应商/品牌)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFieldConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
    /// 允许的分组, 为空表示不限制
    #[serde(default)]
    pub groups: Vec<String>,
}

impl VariantFieldConfig {
    pub fn with_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            required: false,
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// 生效的分组集合; 未启用或未声明分组时返回 None
    pub fn active_groups(&self) -> Option<IndexSet<&str>> {
        if !self.enabled || self.groups.is_empty() {
            return None;
        }
        Some(self.groups.iter().map(String::as_str).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationsConfig {
    #[serde(default)]
    pub colour: Option<VariantFieldConfig>,
    #[serde(default)]
    pub size: Option<VariantFieldConfig>,
    #[serde(default)]
    pub uom: Option<VariantFieldConfig>,
    #[serde(default, alias = "vendor")]
    pub supplier: Option<VariantFieldConfig>,
    #[serde(default)]
    pub brand: Option<VariantFieldConfig>,
}

impl SpecificationsConfig {
    pub fn field(&self, field: VariantField) -> Option<&VariantFieldConfig> {
        match field {
            VariantField::Colour => self.colour.as_ref(),
            VariantField::Size => self.size.as_ref(),
            VariantField::Uom => self.uom.as_ref(),
            VariantField::Supplier => self.supplier.as_ref(),
            VariantField::Brand => self.brand.as_ref(),
        }
    }
}

/// 变体字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantField {
    Colour,
    Size,
    Uom,
    Supplier,
    Brand,
}

impl VariantField {
    pub const ALL: [VariantField; 5] = [
        VariantField::Colour,
        VariantField::Size,
        VariantField::Uom,
        VariantField::Supplier,
        VariantField::Brand,
    ];

    pub fn key(self) -> &'static str {
        match self {
            VariantField::Colour => "colour",
            VariantField::Size => "size",
            VariantField::Uom => "uom",
            VariantField::Supplier => "supplier",
            VariantField::Brand => "brand",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VariantField::Colour => "Colour",
            VariantField::Size => "Size",
            VariantField::Uom => "UOM",
            VariantField::Supplier => "Supplier",
            VariantField::Brand => "Brand",
        }
    }

    /// 接受 "colour" 或 "colour_code" 形式, vendor 视为 supplier
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        let key = key.strip_suffix("_code").unwrap_or(&key);
        match key {
            "colour" => Some(VariantField::Colour),
            "size" => Some(VariantField::Size),
            "uom" => Some(VariantField::Uom),
            "supplier" | "vendor" => Some(VariantField::Supplier),
            "brand" => Some(VariantField::Brand),
            _ => None,
        }
    }
}

/// 自定义字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    pub field_code: String,
    pub field_name: String,
    pub field_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
}

fn default_true() -> bool {
    true
}

/// 分类规格配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpecification {
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default = "default_level")]
    pub category_level: i32,
    #[serde(default)]
    pub specifications: SpecificationsConfig,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldConfig>,
}

fn default_level() -> i32 {
    1
}

impl CategorySpecification {
    pub fn new(category_code: impl Into<String>, specifications: SpecificationsConfig) -> Self {
        Self {
            category_code: category_code.into(),
            category_name: String::new(),
            category_level: default_level(),
            specifications,
            custom_fields: Vec::new(),
        }
    }
}

/// 规格查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum SpecificationOutcome {
    Found(CategorySpecification),
    /// 该分类未配置规格, 属于正常状态
    NotConfigured,
    FetchError(String),
}

/// 规格查询失败时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    /// 按未配置处理, 不过滤
    #[default]
    Unfiltered,
    /// 将错误返回给调用方
    Strict,
}

/// 供应商
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// 品牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// 下拉选项 (颜色/尺码/单位主数据, 或供应商/品牌)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl From<&Supplier> for FieldOption {
    fn from(s: &Supplier) -> Self {
        Self {
            code: s.code.clone(),
            name: s.name.clone(),
            groups: s.groups.clone(),
        }
    }
}

impl From<&Brand> for FieldOption {
    fn from(b: &Brand) -> Self {
        Self {
            code: b.code.clone(),
            name: b.name.clone(),
            groups: b.groups.clone(),
        }
    }
}

/// 表单渲染用的字段描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub field_key: String,
    pub field_name: String,
    pub field_type: String,
    pub required: bool,
    /// 变体字段声明的分组
    #[serde(default)]
    pub groups: Vec<String>,
    /// 自定义字段的固定选项
    #[serde(default)]
    pub options: Vec<String>,
    pub display_order: i32,
}

/// 带分组归属的实体
pub trait GroupMember {
    fn groups(&self) -> &[String];
}

impl GroupMember for Supplier {
    fn groups(&self) -> &[String] {
        &self.groups
    }
}

impl GroupMember for Brand {
    fn groups(&self) -> &[String] {
        &self.groups
    }
}

impl GroupMember for FieldOption {
    fn groups(&self) -> &[String] {
        &self.groups
    }
}

/// 过滤后的候选供应商/品牌
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredCandidates {
    pub suppliers: Vec<Supplier>,
    pub brands: Vec<Brand>,
    pub has_filters: bool,
}
