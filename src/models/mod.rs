pub mod hierarchy;
pub mod line_item;
pub mod specification;

pub use hierarchy::{
    AncestorScope, CategoryNode, HierarchyLevel, HierarchySelection, ResolvedHierarchy,
    SearchMatch,
};
pub use line_item::{
    CalculatedLine, DocumentSummary, ItemMaster, LineInputs, LineItem, DEFAULT_UNIT,
};
pub use specification::{
    Brand, CategorySpecification, CustomFieldConfig, FetchErrorPolicy, FieldOption,
    FilteredCandidates, FormField, GroupMember, SpecificationOutcome, SpecificationsConfig,
    Supplier, VariantField, VariantFieldConfig,
};
