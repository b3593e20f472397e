use futures::try_join;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{SessionError, SourceError, ValidationError};
use crate::models::{
    Brand, CalculatedLine, CategoryNode, DocumentSummary, FetchErrorPolicy, FilteredCandidates,
    HierarchyLevel, ItemMaster, LineInputs, LineItem, SpecificationOutcome, Supplier,
};
use crate::service::calculator::{calculate_line, summarize, validate_document};
use crate::service::resolver::{self, Backfill, CandidateRequest, HierarchyCascade};
use crate::service::source::{HierarchySource, SpecificationSource};
use crate::service::spec_filter::{apply_policy, filter_candidates};

pub type LineId = u64;

/// 请求令牌, 单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

/// 需要防止过期响应覆盖的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchField {
    Candidates(HierarchyLevel),
    Backfill,
    Specification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub line: LineId,
    pub token: RequestToken,
    pub request: CandidateRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBackfill {
    pub line: LineId,
    pub token: RequestToken,
    pub target: CategoryNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSpecification {
    pub line: LineId,
    pub token: RequestToken,
    pub category_code: String,
}

/// 响应处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// 已有更新的请求, 响应被丢弃
    Stale,
}

/// 单行明细的全部状态
#[derive(Debug, Clone)]
pub struct LineEntry {
    pub item: LineItem,
    pub cascade: HierarchyCascade,
    /// 按规格过滤后的供应商/品牌; 级联变化后为 None, 直到重新过滤
    pub candidates: Option<FilteredCandidates>,
    filtered_for: Option<String>,
    latest: HashMap<FetchField, RequestToken>,
}

impl LineEntry {
    fn new(item: LineItem, cascade: HierarchyCascade) -> Self {
        Self {
            item,
            cascade,
            candidates: None,
            filtered_for: None,
            latest: HashMap::new(),
        }
    }

    fn is_latest(&self, field: FetchField, token: RequestToken) -> bool {
        self.latest.get(&field) == Some(&token)
    }

    /// 级联变化后旧分类的过滤结果作废
    fn reset_filter(&mut self) {
        self.candidates = None;
        self.filtered_for = None;
    }

    /// 有效分类编码变化后需要重新过滤
    pub fn needs_specification_refresh(&self) -> bool {
        self.filtered_for.as_deref() != Some(self.cascade.effective_code().as_str())
    }

    pub fn calculate(&self) -> CalculatedLine {
        calculate_line(&self.item)
    }
}

/// 一张采购单据的明细集合, 按行 ID 管理
#[derive(Debug, Clone, Default)]
pub struct DocumentSession {
    lines: IndexMap<LineId, LineEntry>,
    categories: Vec<CategoryNode>,
    next_line: LineId,
    next_token: u64,
}

impl DocumentSession {
    /// categories 为第 1 层候选, 新增行时复制
    pub fn new(categories: Vec<CategoryNode>) -> Self {
        Self {
            categories,
            ..Self::default()
        }
    }

    pub async fn load<S>(source: &S) -> Self
    where
        S: HierarchySource + ?Sized,
    {
        Self::new(resolver::load_candidates(source, HierarchyLevel::Category, None).await)
    }

    pub fn add_line(&mut self, item: LineItem) -> LineId {
        self.next_line += 1;
        let id = self.next_line;
        let cascade = HierarchyCascade::with_categories(self.categories.clone());
        self.lines.insert(id, LineEntry::new(item, cascade));
        id
    }

    pub fn remove_line(&mut self, id: LineId) -> Result<LineItem, SessionError> {
        self.lines
            .shift_remove(&id)
            .map(|entry| entry.item)
            .ok_or(SessionError::UnknownLine(id))
    }

    pub fn line(&self, id: LineId) -> Option<&LineEntry> {
        self.lines.get(&id)
    }

    pub fn line_ids(&self) -> impl Iterator<Item = LineId> + '_ {
        self.lines.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn entry_mut(&mut self, id: LineId) -> Result<&mut LineEntry, SessionError> {
        self.lines.get_mut(&id).ok_or(SessionError::UnknownLine(id))
    }

    fn issue(&mut self, id: LineId, field: FetchField) -> Result<RequestToken, SessionError> {
        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.entry_mut(id)?.latest.insert(field, token);
        Ok(token)
    }

    /// 使该字段所有在途请求失效
    fn supersede(&mut self, id: LineId, fields: impl IntoIterator<Item = FetchField>) -> Result<(), SessionError> {
        for field in fields {
            self.issue(id, field)?;
        }
        Ok(())
    }

    pub fn update_inputs(&mut self, id: LineId, inputs: LineInputs) -> Result<CalculatedLine, SessionError> {
        let entry = self.entry_mut(id)?;
        inputs.apply_to(&mut entry.item);
        Ok(entry.calculate())
    }

    pub fn apply_item_master(&mut self, id: LineId, item: &ItemMaster) -> Result<CalculatedLine, SessionError> {
        let entry = self.entry_mut(id)?;
        entry.item.apply_item_master(item);
        Ok(entry.calculate())
    }

    pub fn set_specification_value(
        &mut self,
        id: LineId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.entry_mut(id)?
            .item
            .specifications
            .insert(key.into(), value.into());
        Ok(())
    }

    pub fn calculated_lines(&self) -> Vec<CalculatedLine> {
        self.lines.values().map(LineEntry::calculate).collect()
    }

    /// 汇总总是从全部明细重新计算
    pub fn summary(&self) -> DocumentSummary {
        summarize(&self.calculated_lines())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let items: Vec<LineItem> = self.lines.values().map(|e| e.item.clone()).collect();
        validate_document(&items)
    }

    // ---- 层级选择 ----

    /// 选中节点, 返回需要加载下一层候选的请求
    pub fn begin_select(&mut self, id: LineId, node: CategoryNode) -> Result<Option<PendingFetch>, SessionError> {
        let level = node.level;
        let entry = self.entry_mut(id)?;
        let request = entry.cascade.select(node)?;
        entry.reset_filter();

        let mut stale: Vec<FetchField> = level.descendants().map(FetchField::Candidates).collect();
        stale.push(FetchField::Backfill);
        stale.push(FetchField::Specification);
        self.supersede(id, stale)?;

        let Some(request) = request else {
            return Ok(None);
        };
        let token = self.issue(id, FetchField::Candidates(request.level))?;
        Ok(Some(PendingFetch {
            line: id,
            token,
            request,
        }))
    }

    pub fn complete_candidates(
        &mut self,
        pending: &PendingFetch,
        result: Result<Vec<CategoryNode>, SourceError>,
    ) -> Completion {
        let level = pending.request.level;
        let Some(entry) = self.lines.get_mut(&pending.line) else {
            tracing::debug!("Line {} removed before {} candidates arrived", pending.line, level);
            return Completion::Stale;
        };
        if !entry.is_latest(FetchField::Candidates(level), pending.token) {
            tracing::debug!("Discarding stale {} candidates for line {}", level, pending.line);
            return Completion::Stale;
        }

        let nodes = result.unwrap_or_else(|e| {
            resolver::log_fetch_failure(level, Some(&pending.request.scope), &e);
            Vec::new()
        });
        entry.cascade.set_candidates(level, nodes);
        Completion::Applied
    }

    pub async fn select_level<S>(&mut self, source: &S, id: LineId, node: CategoryNode) -> Result<Completion, SessionError>
    where
        S: HierarchySource + ?Sized,
    {
        let Some(pending) = self.begin_select(id, node)? else {
            return Ok(Completion::Applied);
        };
        let result = source
            .list_nodes(pending.request.level, Some(&pending.request.scope))
            .await;
        Ok(self.complete_candidates(&pending, result))
    }

    /// 取消某层级及以下的选择
    pub fn clear_level(&mut self, id: LineId, level: HierarchyLevel) -> Result<(), SessionError> {
        let entry = self.entry_mut(id)?;
        entry.cascade.clear_from(level);
        entry.reset_filter();
        let mut stale: Vec<FetchField> = level.descendants().map(FetchField::Candidates).collect();
        stale.push(FetchField::Backfill);
        stale.push(FetchField::Specification);
        self.supersede(id, stale)
    }

    // ---- 搜索回填 ----

    pub fn begin_backfill(&mut self, id: LineId, target: CategoryNode) -> Result<PendingBackfill, SessionError> {
        let mut stale: Vec<FetchField> = HierarchyLevel::ALL
            .into_iter()
            .map(FetchField::Candidates)
            .collect();
        stale.push(FetchField::Specification);
        self.supersede(id, stale)?;

        let token = self.issue(id, FetchField::Backfill)?;
        Ok(PendingBackfill {
            line: id,
            token,
            target,
        })
    }

    pub fn complete_backfill(&mut self, pending: &PendingBackfill, backfill: Backfill) -> Completion {
        let Some(entry) = self.lines.get_mut(&pending.line) else {
            return Completion::Stale;
        };
        if !entry.is_latest(FetchField::Backfill, pending.token) {
            tracing::debug!("Discarding stale backfill of {} for line {}", pending.target.code, pending.line);
            return Completion::Stale;
        }

        if !backfill.is_complete() {
            tracing::warn!(
                "Backfill of {} for line {} stopped at {:?}",
                pending.target.code,
                pending.line,
                backfill.reached
            );
        }
        entry.cascade = backfill.cascade;
        entry.reset_filter();
        Completion::Applied
    }

    pub async fn select_search_match<S>(
        &mut self,
        source: &S,
        id: LineId,
        target: CategoryNode,
    ) -> Result<Completion, SessionError>
    where
        S: HierarchySource + ?Sized,
    {
        let pending = self.begin_backfill(id, target)?;
        let backfill = resolver::backfill(source, &pending.target).await?;
        Ok(self.complete_backfill(&pending, backfill))
    }

    // ---- 规格过滤 ----

    pub fn begin_specification(&mut self, id: LineId) -> Result<PendingSpecification, SessionError> {
        let category_code = self.entry_mut(id)?.cascade.effective_code();
        let token = self.issue(id, FetchField::Specification)?;
        Ok(PendingSpecification {
            line: id,
            token,
            category_code,
        })
    }

    pub fn complete_specification(
        &mut self,
        pending: &PendingSpecification,
        outcome: SpecificationOutcome,
        suppliers: &[Supplier],
        brands: &[Brand],
        policy: FetchErrorPolicy,
    ) -> Result<Completion, SessionError> {
        let Some(entry) = self.lines.get_mut(&pending.line) else {
            return Ok(Completion::Stale);
        };
        if !entry.is_latest(FetchField::Specification, pending.token) {
            tracing::debug!(
                "Discarding stale specification {} for line {}",
                pending.category_code,
                pending.line
            );
            return Ok(Completion::Stale);
        }

        let spec = apply_policy(&pending.category_code, outcome, policy)?;
        entry.candidates = Some(filter_candidates(spec.as_ref(), suppliers, brands));
        entry.filtered_for = Some(pending.category_code.clone());
        Ok(Completion::Applied)
    }

    pub async fn refresh_specification<S>(
        &mut self,
        source: &S,
        id: LineId,
        policy: FetchErrorPolicy,
    ) -> Result<Completion, SessionError>
    where
        S: SpecificationSource + ?Sized,
    {
        let pending = self.begin_specification(id)?;
        let (suppliers, brands) = try_join!(source.list_suppliers(), source.list_brands())?;
        let outcome = if pending.category_code.is_empty() {
            SpecificationOutcome::NotConfigured
        } else {
            source.fetch_specification(&pending.category_code).await
        };
        self.complete_specification(&pending, outcome, &suppliers, &brands, policy)
    }

    /// 对有效分类编码已变化的行重新过滤
    pub async fn refresh_stale_specifications<S>(
        &mut self,
        source: &S,
        policy: FetchErrorPolicy,
    ) -> Result<usize, SessionError>
    where
        S: SpecificationSource + ?Sized,
    {
        let stale: Vec<LineId> = self
            .lines
            .iter()
            .filter(|(_, entry)| entry.needs_specification_refresh())
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            self.refresh_specification(source, *id, policy).await?;
        }
        Ok(stale.len())
    }
}
