use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::models::{
    AncestorScope, Brand, CategoryNode, CategorySpecification, CustomFieldConfig, FieldOption,
    HierarchyLevel, SpecificationsConfig, Supplier, VariantField,
};

/// 层级对应的表与编码/名称列
struct LevelTable {
    table: &'static str,
    code: &'static str,
    name: &'static str,
    parent: Option<&'static str>,
}

fn level_table(level: HierarchyLevel) -> LevelTable {
    match level {
        HierarchyLevel::Category => LevelTable {
            table: "item_categories",
            code: "category_code",
            name: "category_name",
            parent: None,
        },
        HierarchyLevel::SubCategory => LevelTable {
            table: "item_sub_categories",
            code: "sub_category_code",
            name: "sub_category_name",
            parent: Some("category_code"),
        },
        HierarchyLevel::Division => LevelTable {
            table: "item_divisions",
            code: "division_code",
            name: "division_name",
            parent: Some("sub_category_code"),
        },
        HierarchyLevel::Class => LevelTable {
            table: "item_classes",
            code: "class_code",
            name: "class_name",
            parent: Some("division_code"),
        },
        HierarchyLevel::SubClass => LevelTable {
            table: "item_sub_classes",
            code: "sub_class_code",
            name: "sub_class_name",
            parent: Some("class_code"),
        },
    }
}

/// 下层表冗余保存了所有祖先编码, 列名与祖先层级的编码列一致
fn scope_column(scope: &AncestorScope) -> &'static str {
    level_table(scope.level).code
}

#[derive(Debug, FromRow)]
struct NodeRow {
    code: String,
    name: String,
    parent_code: Option<String>,
}

impl NodeRow {
    fn into_node(self, level: HierarchyLevel) -> CategoryNode {
        CategoryNode {
            level,
            code: self.code,
            name: self.name,
            parent_code: self.parent_code,
        }
    }
}

fn select_nodes_sql(level: HierarchyLevel, filter_column: Option<&str>) -> String {
    let t = level_table(level);
    let parent = t.parent.unwrap_or("NULL::text");
    let mut sql = format!(
        "SELECT {code} AS code, {name} AS name, {parent} AS parent_code \
         FROM {table} WHERE is_active = TRUE AND is_deleted = FALSE",
        code = t.code,
        name = t.name,
        parent = parent,
        table = t.table,
    );
    if let Some(column) = filter_column {
        sql.push_str(&format!(" AND {} = $1", column));
    }
    sql.push_str(&format!(" ORDER BY sort_order, {}", t.code));
    sql
}

/// 查询某层级的启用节点, scope 为祖先层级编码过滤
pub async fn list_nodes(
    pool: &PgPool,
    level: HierarchyLevel,
    scope: Option<&AncestorScope>,
) -> Result<Vec<CategoryNode>, sqlx::Error> {
    let rows = match scope {
        Some(scope) => {
            let sql = select_nodes_sql(level, Some(scope_column(scope)));
            sqlx::query_as::<_, NodeRow>(&sql)
                .bind(scope.code.to_uppercase())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = select_nodes_sql(level, None);
            sqlx::query_as::<_, NodeRow>(&sql).fetch_all(pool).await?
        }
    };

    Ok(rows.into_iter().map(|r| r.into_node(level)).collect())
}

/// 按编码查询单个节点
pub async fn find_node(
    pool: &PgPool,
    level: HierarchyLevel,
    code: &str,
) -> Result<Option<CategoryNode>, sqlx::Error> {
    let sql = select_nodes_sql(level, Some(level_table(level).code));
    let row = sqlx::query_as::<_, NodeRow>(&sql)
        .bind(code.to_uppercase())
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.into_node(level)))
}

#[derive(Debug, FromRow)]
struct SpecificationRow {
    category_code: String,
    category_name: String,
    category_level: i32,
    specifications: Json<SpecificationsConfig>,
    custom_fields: Json<Vec<CustomFieldConfig>>,
}

/// 查询分类规格配置
pub async fn get_specification(
    pool: &PgPool,
    category_code: &str,
) -> Result<Option<CategorySpecification>, sqlx::Error> {
    let row = sqlx::query_as::<_, SpecificationRow>(
        r#"
        SELECT category_code, category_name, category_level, specifications, custom_fields
        FROM category_specifications
        WHERE category_code = $1
          AND is_active = TRUE
        "#,
    )
    .bind(category_code.to_uppercase())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| CategorySpecification {
        category_code: r.category_code,
        category_name: r.category_name,
        category_level: r.category_level,
        specifications: r.specifications.0,
        custom_fields: r.custom_fields.0,
    }))
}

/// 查询启用的供应商及其分组
pub async fn list_suppliers(pool: &PgPool) -> Result<Vec<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, (String, String, Vec<String>)>(
        r#"
        SELECT supplier_code, supplier_name, COALESCE(supplier_groups, '{}') AS groups
        FROM supplier_master
        WHERE is_active = TRUE
        ORDER BY supplier_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map(|rows| {
        rows.into_iter()
            .map(|(code, name, groups)| Supplier { code, name, groups })
            .collect()
    })
}

/// 查询启用的品牌及其分组
pub async fn list_brands(pool: &PgPool) -> Result<Vec<Brand>, sqlx::Error> {
    sqlx::query_as::<_, (String, String, Vec<String>)>(
        r#"
        SELECT brand_code, brand_name, COALESCE(brand_groups, '{}') AS groups
        FROM brand_master
        WHERE is_active = TRUE
        ORDER BY brand_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map(|rows| {
        rows.into_iter()
            .map(|(code, name, groups)| Brand { code, name, groups })
            .collect()
    })
}

/// 颜色/尺码/单位主数据表, 每行只属于一个分组
struct MasterTable {
    table: &'static str,
    code: &'static str,
    name: &'static str,
    group: &'static str,
}

fn master_table(field: VariantField) -> Option<MasterTable> {
    let (table, code, name, group) = match field {
        VariantField::Colour => ("colour_master", "colour_code", "colour_name", "colour_group"),
        VariantField::Size => ("size_master", "size_code", "size_name", "size_group"),
        VariantField::Uom => ("uom_master", "uom_code", "uom_name", "uom_group"),
        VariantField::Supplier | VariantField::Brand => return None,
    };
    Some(MasterTable { table, code, name, group })
}

fn select_master_sql(t: &MasterTable) -> String {
    format!(
        "SELECT {code}, {name}, ARRAY_REMOVE(ARRAY[{group}], NULL) AS groups \
         FROM {table} WHERE is_active = TRUE ORDER BY display_order, {code}",
        code = t.code,
        name = t.name,
        group = t.group,
        table = t.table,
    )
}

/// 查询颜色/尺码/单位主数据; 供应商和品牌走各自的查询
pub async fn list_master_options(
    pool: &PgPool,
    field: VariantField,
) -> Result<Vec<FieldOption>, sqlx::Error> {
    let Some(table) = master_table(field) else {
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, (String, String, Vec<String>)>(&select_master_sql(&table))
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(code, name, groups)| FieldOption { code, name, groups })
        .collect())
}
