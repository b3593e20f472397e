use axum::{
    extract::{Json, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiResponse, AppState};
use crate::error::AppError;
use crate::models::{
    AncestorScope, CalculatedLine, CategoryNode, DocumentSummary, FieldOption, FilteredCandidates,
    FormField, HierarchyLevel, HierarchySelection, LineItem, ResolvedHierarchy, SearchMatch,
    VariantField,
};
use crate::service::{calculate_line, calculate_lines, export, resolve, summarize, validate_document};

/// 请求体: 单据明细
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub items: Vec<LineItem>,
}

/// 单据计算结果
#[derive(Debug, Serialize)]
pub struct DocumentResult {
    pub lines: Vec<CalculatedLine>,
    pub summary: DocumentSummary,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    pub parent_level: Option<u8>,
    pub parent_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// 自顶向下的编码, 逗号分隔
    pub codes: String,
}

fn parse_level(depth: u8) -> Result<HierarchyLevel, AppError> {
    HierarchyLevel::from_depth(depth)
        .ok_or_else(|| AppError::BadRequest(format!("level must be 1-5, got {}", depth)))
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 单行计算
pub async fn calculate(Json(item): Json<LineItem>) -> Json<ApiResponse<CalculatedLine>> {
    Json(ApiResponse::ok("calculated", calculate_line(&item)))
}

/// 校验并汇总单据
pub async fn summarize_document(
    Json(req): Json<DocumentRequest>,
) -> Result<Json<ApiResponse<DocumentResult>>, AppError> {
    validate_document(&req.items)?;

    let lines = calculate_lines(&req.items);
    let summary = summarize(&lines);
    tracing::info!(
        "Summarized document: {} lines, grand total {}",
        lines.len(),
        summary.grand_total
    );

    Ok(Json(ApiResponse::ok(
        format!("Summarized {} lines", lines.len()),
        DocumentResult {
            lines,
            summary,
            calculated_at: Utc::now(),
        },
    )))
}

/// 导出 CSV
pub async fn export_document(Json(req): Json<DocumentRequest>) -> Result<impl IntoResponse, AppError> {
    validate_document(&req.items)?;

    let lines = calculate_lines(&req.items);
    let summary = summarize(&lines);
    let mut body = Vec::new();
    export::write_lines_csv(&lines, &summary, &mut body)?;

    let disposition = format!(
        "attachment; filename=\"document_{}.csv\"",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// 某层级的候选节点
pub async fn list_nodes(
    State(state): State<AppState>,
    Path(depth): Path<u8>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryNode>>>, AppError> {
    let level = parse_level(depth)?;
    let scope = match (query.parent_level, query.parent_code) {
        (Some(parent_depth), Some(code)) => {
            let parent = parse_level(parent_depth)?;
            if parent >= level {
                return Err(AppError::BadRequest(format!(
                    "parent level {} must be above {}",
                    parent_depth, depth
                )));
            }
            Some(AncestorScope::new(parent, code))
        }
        (None, Some(code)) => match level.parent() {
            Some(parent) => Some(AncestorScope::new(parent, code)),
            None => return Err(AppError::BadRequest("categories have no parent".into())),
        },
        _ => None,
    };

    let nodes = state.hierarchy.list_nodes(level, scope.as_ref()).await?;
    Ok(Json(ApiResponse::ok(format!("{} nodes", nodes.len()), nodes)))
}

/// 层级搜索
pub async fn search_hierarchy(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<ApiResponse<Vec<SearchMatch>>> {
    let matches = state.search.search(state.hierarchy.as_ref(), &query.q).await;
    Json(ApiResponse::ok(format!("{} matches", matches.len()), matches))
}

/// 根据自顶向下的编码解析有效编码与路径
pub async fn resolve_codes(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ApiResponse<ResolvedHierarchy>>, AppError> {
    let codes: Vec<&str> = query
        .codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if codes.len() > HierarchyLevel::ALL.len() {
        return Err(AppError::BadRequest(format!(
            "at most {} codes allowed",
            HierarchyLevel::ALL.len()
        )));
    }

    let mut nodes = Vec::with_capacity(codes.len());
    for (level, code) in HierarchyLevel::ALL.into_iter().zip(codes) {
        let node = state
            .hierarchy
            .find_node(level, code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} '{}'", level, code)))?;
        nodes.push(node);
    }

    let selection = HierarchySelection::from_path(nodes)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let resolved = resolve(&selection);
    Ok(Json(ApiResponse::ok(resolved.path.clone(), resolved)))
}

/// 按分类规格过滤后的供应商/品牌
pub async fn specification_candidates(
    State(state): State<AppState>,
    Path(category_code): Path<String>,
) -> Result<Json<ApiResponse<FilteredCandidates>>, AppError> {
    let candidates = state.specifications.candidates_for(&category_code).await?;
    let message = if candidates.has_filters {
        format!("Filtered by specifications of {}", category_code)
    } else {
        "No specification filters".to_string()
    };
    Ok(Json(ApiResponse::ok(message, candidates)))
}

fn no_specification(category_code: &str) -> AppError {
    AppError::NotFound(format!("specifications for category '{}'", category_code))
}

/// 分类表单字段
pub async fn specification_form_fields(
    State(state): State<AppState>,
    Path(category_code): Path<String>,
) -> Result<Json<ApiResponse<Vec<FormField>>>, AppError> {
    let fields = state
        .specifications
        .form_fields_for(&category_code)
        .await?
        .ok_or_else(|| no_specification(&category_code))?;
    Ok(Json(ApiResponse::ok(format!("{} fields", fields.len()), fields)))
}

/// 分类下某个变体字段的下拉选项
pub async fn specification_field_values(
    State(state): State<AppState>,
    Path((category_code, field_key)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<FieldOption>>>, AppError> {
    let field = VariantField::parse(&field_key)
        .ok_or_else(|| AppError::BadRequest(format!("unknown field '{}'", field_key)))?;
    let options = state
        .specifications
        .field_values_for(&category_code, field)
        .await?
        .ok_or_else(|| no_specification(&category_code))?;
    Ok(Json(ApiResponse::ok(format!("{} options", options.len()), options)))
}
