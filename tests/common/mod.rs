#![allow(dead_code)]

use async_trait::async_trait;
use procure_core::error::SourceError;
use procure_core::models::{
    AncestorScope, Brand, CategoryNode, CategorySpecification, CustomFieldConfig, FieldOption,
    HierarchyLevel, SpecificationOutcome, SpecificationsConfig, Supplier, VariantField,
    VariantFieldConfig,
};
use procure_core::service::{HierarchySource, SpecificationSource};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// 内存目录, 可按层级注入失败
#[derive(Default)]
pub struct MemoryCatalog {
    nodes: Vec<CategoryNode>,
    specs: HashMap<String, CategorySpecification>,
    suppliers: Vec<Supplier>,
    brands: Vec<Brand>,
    options: HashMap<VariantField, Vec<FieldOption>>,
    failing_levels: Mutex<HashSet<HierarchyLevel>>,
    failing_specs: Mutex<bool>,
    failing_lookups: Mutex<bool>,
}

fn node(level: HierarchyLevel, code: &str, name: &str, parent: Option<&str>) -> CategoryNode {
    CategoryNode::new(level, code, name, parent)
}

fn option(code: &str, group: &str) -> FieldOption {
    FieldOption {
        code: code.to_string(),
        name: code.to_lowercase(),
        groups: vec![group.to_string()],
    }
}

fn custom_field(code: &str, display_order: i32, enabled: bool) -> CustomFieldConfig {
    CustomFieldConfig {
        field_code: code.to_string(),
        field_name: code.replace('_', " "),
        field_type: "text".to_string(),
        enabled,
        required: false,
        options: Vec::new(),
        display_order,
    }
}

impl MemoryCatalog {
    /// Apparel > Men > Topwear > T-Shirts > Round Neck, 以及若干兄弟节点
    pub fn apparel() -> Self {
        use HierarchyLevel::*;
        let nodes = vec![
            node(Category, "APRL", "Apparel", None),
            node(Category, "FABR", "Fabric", None),
            node(SubCategory, "MENS", "Men", Some("APRL")),
            node(SubCategory, "WMNS", "Women", Some("APRL")),
            node(SubCategory, "COTN", "Cotton", Some("FABR")),
            node(Division, "TOPW", "Topwear", Some("MENS")),
            node(Division, "BTMW", "Bottomwear", Some("MENS")),
            node(Division, "ETHN", "Ethnic", Some("WMNS")),
            node(Class, "TSHT", "T-Shirts", Some("TOPW")),
            node(Class, "SHRT", "Shirts", Some("TOPW")),
            node(Class, "JEAN", "Jeans", Some("BTMW")),
            node(SubClass, "RNCK", "Round Neck", Some("TSHT")),
            node(SubClass, "VNCK", "V Neck", Some("TSHT")),
            node(SubClass, "FORM", "Formal", Some("SHRT")),
            node(SubClass, "SLIM", "Slim Fit", Some("JEAN")),
        ];

        let mut topwear = CategorySpecification::new(
            "TOPW",
            SpecificationsConfig {
                colour: Some(VariantFieldConfig::with_groups(["BASIC"])),
                size: Some(VariantFieldConfig {
                    enabled: true,
                    required: true,
                    groups: Vec::new(),
                }),
                uom: Some(VariantFieldConfig {
                    enabled: false,
                    ..VariantFieldConfig::with_groups(["COUNT"])
                }),
                supplier: Some(VariantFieldConfig::with_groups(["KNITTERS"])),
                brand: Some(VariantFieldConfig::with_groups(["PREMIUM"])),
            },
        );
        topwear.custom_fields = vec![
            custom_field("fit", 2, true),
            custom_field("neckline", 1, true),
            custom_field("legacy_ref", 3, false),
        ];

        let mut specs = HashMap::new();
        specs.insert("TOPW".to_string(), topwear);
        specs.insert(
            "JEAN".to_string(),
            CategorySpecification::new(
                "JEAN",
                SpecificationsConfig {
                    supplier: Some(VariantFieldConfig::with_groups(["DENIM"])),
                    ..Default::default()
                },
            ),
        );

        let supplier = |code: &str, groups: &[&str]| Supplier {
            code: code.to_string(),
            name: format!("{code} Mills"),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        };
        let brand = |code: &str, groups: &[&str]| Brand {
            code: code.to_string(),
            name: format!("{code} Label"),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        };

        Self {
            nodes,
            specs,
            suppliers: vec![
                supplier("S-KNIT", &["KNITTERS"]),
                supplier("S-DENIM", &["DENIM"]),
                supplier("S-BOTH", &["KNITTERS", "DENIM"]),
                supplier("S-NONE", &[]),
            ],
            brands: vec![brand("B-PREM", &["PREMIUM"]), brand("B-VAL", &["VALUE"])],
            options: HashMap::from([
                (
                    VariantField::Colour,
                    vec![
                        option("RED", "BASIC"),
                        option("NAVY", "BASIC"),
                        option("NEON", "FLUO"),
                    ],
                ),
                (
                    VariantField::Size,
                    vec![option("S", "ALPHA"), option("M", "ALPHA"), option("32", "WAIST")],
                ),
                (VariantField::Uom, vec![option("PCS", "COUNT"), option("MTR", "LENGTH")]),
            ]),
            ..Default::default()
        }
    }

    pub fn with_node(mut self, node: CategoryNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// find_node 返回错误
    pub fn fail_lookups(&self) {
        *self.failing_lookups.lock().unwrap() = true;
    }

    pub fn fail_level(&self, level: HierarchyLevel) {
        self.failing_levels.lock().unwrap().insert(level);
    }

    pub fn fail_specifications(&self) {
        *self.failing_specs.lock().unwrap() = true;
    }

    pub fn node(&self, level: HierarchyLevel, code: &str) -> CategoryNode {
        self.nodes
            .iter()
            .find(|n| n.level == level && n.code == code)
            .cloned()
            .unwrap_or_else(|| panic!("no {level} {code} in fixture"))
    }

    fn parent_of(&self, node: &CategoryNode) -> Option<&CategoryNode> {
        let level = node.level.parent()?;
        let code = node.parent_code.as_deref()?;
        self.nodes.iter().find(|n| n.level == level && n.code == code)
    }

    fn under(&self, node: &CategoryNode, scope: &AncestorScope) -> bool {
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            if parent.level == scope.level && parent.code == scope.code {
                return true;
            }
            current = parent;
        }
        false
    }
}

#[async_trait]
impl HierarchySource for MemoryCatalog {
    async fn list_nodes(
        &self,
        level: HierarchyLevel,
        scope: Option<&AncestorScope>,
    ) -> Result<Vec<CategoryNode>, SourceError> {
        if self.failing_levels.lock().unwrap().contains(&level) {
            return Err(SourceError::Unavailable(format!("{level} offline")));
        }
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.level == level)
            .filter(|n| scope.map_or(true, |s| self.under(n, s)))
            .cloned()
            .collect())
    }

    async fn find_node(
        &self,
        level: HierarchyLevel,
        code: &str,
    ) -> Result<Option<CategoryNode>, SourceError> {
        if *self.failing_lookups.lock().unwrap() {
            return Err(SourceError::Unavailable(format!("{level} lookup offline")));
        }
        Ok(self
            .nodes
            .iter()
            .find(|n| n.level == level && n.code == code)
            .cloned())
    }
}

#[async_trait]
impl SpecificationSource for MemoryCatalog {
    async fn fetch_specification(&self, category_code: &str) -> SpecificationOutcome {
        if *self.failing_specs.lock().unwrap() {
            return SpecificationOutcome::FetchError("connection reset".into());
        }
        match self.specs.get(category_code) {
            Some(spec) => SpecificationOutcome::Found(spec.clone()),
            None => SpecificationOutcome::NotConfigured,
        }
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, SourceError> {
        Ok(self.suppliers.clone())
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, SourceError> {
        Ok(self.brands.clone())
    }

    async fn list_field_options(&self, field: VariantField) -> Result<Vec<FieldOption>, SourceError> {
        Ok(match field {
            VariantField::Supplier => self.suppliers.iter().map(FieldOption::from).collect(),
            VariantField::Brand => self.brands.iter().map(FieldOption::from).collect(),
            _ => self.options.get(&field).cloned().unwrap_or_default(),
        })
    }
}

pub fn codes(nodes: &[CategoryNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.code.as_str()).collect()
}
