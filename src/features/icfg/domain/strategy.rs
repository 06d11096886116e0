//! ICFG Builder parameters: how to discover an indirect call site's
//! candidate callees, and how far to trust that discovery.

/// Governs the base candidate universe offered to an indirect call site,
/// before `ResolveStrategy` narrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkerStrategy {
    /// Candidates are every function whose address can flow to the call's
    /// pointer per the caller's points-to graph; `ResolveStrategy` does the
    /// actual narrowing, so this walker only widens the universe to "any
    /// known function".
    Pointer,
    /// Candidates are the union of every vtable slot recorded in the class
    /// hierarchy: the classic type-based over-approximation.
    Cha,
    /// As `Cha`, but candidates arising only from a contested (ambiguous
    /// base-subobject) relation are dropped, since a contested base cannot
    /// be soundly attributed to one instantiated type.
    Rta,
}

/// Governs how far an indirect call site's candidate set is narrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// The walker's candidate set, unfiltered.
    Declared,
    /// The walker's candidate set, filtered to functions whose
    /// [`crate::ir::function_value_id`] marker may-alias the call's pointer
    /// in the caller's points-to graph.
    PointsTo,
}
