//! Domain-transfer resolution.
//!
//! Decides, while a pipeline is being assembled, whether a legal domain
//! assignment exists for every stage boundary - before any I/O happens.
//! Each processor stage gets a [`DomainTransferMap`] built by probing its
//! specifier's transfer function against every domain still possible at
//! that point; appending later stages prunes earlier maps backward until a
//! fixed point, so no stage is left believing it could emit a domain that
//! a downstream stage has proven unreachable.

use std::collections::BTreeMap;

use crate::domain::{Domain, DomainSet};
use crate::registry::StageSpecifier;

/// Mapping from candidate input domain to resulting output domain for one
/// processor stage, restricted to the inputs its transfer function accepts.
///
/// Computed per stage while the pipeline is built and discarded afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainTransferMap {
    entries: BTreeMap<Domain, Domain>,
}

impl DomainTransferMap {
    /// Probes `specifier`'s transfer function against each candidate input
    /// domain, keeping the ones it accepts.
    ///
    /// Probing calls must be safe to invoke and discard: transfer
    /// functions take `&self` and may not perform I/O or touch stage
    /// state.
    pub fn probe(specifier: &dyn StageSpecifier, candidates: &DomainSet) -> Self {
        let mut entries = BTreeMap::new();
        for input in candidates.iter() {
            if let Ok(output) = specifier.domain_transfer(input) {
                entries.insert(input, output);
            }
        }
        Self { entries }
    }

    /// True if no candidate input domain was accepted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The accepted input domains.
    pub fn inputs(&self) -> DomainSet {
        self.entries.keys().copied().collect()
    }

    /// The reachable output domains.
    pub fn outputs(&self) -> DomainSet {
        self.entries.values().copied().collect()
    }

    /// The output domain for a given input, if accepted.
    pub fn get(&self, input: Domain) -> Option<Domain> {
        self.entries.get(&input).copied()
    }

    /// Drops every entry whose output is not in `allowed`. Returns true if
    /// anything was removed.
    pub fn restrict_outputs(&mut self, allowed: &DomainSet) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, output| allowed.contains(*output));
        self.entries.len() != before
    }
}

/// Prunes the transfer maps of all stages upstream of a new restriction.
///
/// `allowed` is the domain set the just-appended stage accepts; `maps` are
/// the earlier processors' transfer maps in pipeline order. Walks backward
/// removing entries whose output fell outside the allowed set, narrowing
/// the allowed set to each pruned map's inputs as it goes, and stops at
/// the first step that removes nothing (the fixed point - earlier maps
/// were already consistent with it).
///
/// Returns the index of the first map that was emptied by pruning, if any;
/// an emptied map means the whole stage sequence is domain-infeasible.
pub fn prune_backward(maps: &mut [DomainTransferMap], mut allowed: DomainSet) -> Option<usize> {
    for (index, map) in maps.iter_mut().enumerate().rev() {
        let removed = map.restrict_outputs(&allowed);
        if map.is_empty() {
            return Some(index);
        }
        if !removed {
            break;
        }
        allowed = map.inputs();
    }
    None
}
