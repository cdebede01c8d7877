use strata_schema::Policy;

/// Which write operation a nested entity is being planned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// What to do with a nested entity while its parent is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NestedAction {
    /// Persist the child: put it if keyed, create it otherwise.
    Write,
    /// Leave the child and its stored record untouched.
    Skip,
    /// The child became empty: delete its stored record and clear its key.
    Discard,
    /// The child is empty but carries keys from an earlier write elsewhere:
    /// clear them so the parent records nothing, and leave stored records be.
    Detach,
}

/// Decide how a nested entity is handled.
///
/// | policy   | create                                 | update                                     |
/// |----------|----------------------------------------|--------------------------------------------|
/// | always   | write                                  | write                                      |
/// | zero     | detach if empty and keyed, else skip if empty | discard if empty and keyed, else skip if empty |
/// | readonly | skip if already keyed                  | skip if already keyed                      |
pub fn plan(policy: Policy, mode: WriteMode, empty: bool, keyed: bool) -> NestedAction {
    match (policy, mode) {
        (Policy::Always, _) => NestedAction::Write,
        (Policy::Zero, _) if !empty => NestedAction::Write,
        (Policy::Zero, WriteMode::Update) if keyed => NestedAction::Discard,
        (Policy::Zero, WriteMode::Create) if keyed => NestedAction::Detach,
        (Policy::Zero, _) => NestedAction::Skip,
        (Policy::Readonly, _) if keyed => NestedAction::Skip,
        (Policy::Readonly, _) => NestedAction::Write,
    }
}
