//! Combination Generator
//!
//! Expands a [`VariationTree`] into every sellable combination:
//!
//! - **simple**: one option of one leaf attribute
//! - **composite**: for every k-subset (k ≥ 2) of root attributes, the
//!   cartesian product of the active options of all leaves under those roots
//!
//! Enumeration is lazy ([`CombinationIter`]); only [`CombinationGenerator::generate`]
//! collects, after checking the predicted size against the configured limit.

mod enumerate;

pub use enumerate::{CartesianProduct, KSubsets};

use crate::core::{EngineConfig, EngineError, EngineResult};
use crate::tree::VariationTree;
use rust_decimal::Decimal;
use shared::models::{Combination, CombinationKey, CombinationOrigin, OptionValue};
use shared::util::new_id;
use std::collections::{HashMap, HashSet};

/// One leaf attribute with its active options
#[derive(Debug, Clone)]
struct Column<'a> {
    root_id: &'a str,
    /// Root-to-leaf path, already joined
    path: String,
    options: Vec<&'a OptionValue>,
}

/// Combination generator over a validated tree
pub struct CombinationGenerator<'a> {
    config: &'a EngineConfig,
    columns: Vec<Column<'a>>,
    /// Per root attribute: positions in `columns`
    groups: Vec<Vec<usize>>,
}

impl<'a> CombinationGenerator<'a> {
    pub fn new(tree: &'a VariationTree, config: &'a EngineConfig) -> Self {
        let forest = tree.forest();
        let mut columns = Vec::new();
        let mut groups = Vec::with_capacity(forest.root_count());

        for root in forest.roots() {
            let mut group = Vec::new();
            for leaf in forest.leaves_under(&root.id) {
                group.push(columns.len());
                columns.push(Column {
                    root_id: root.id.as_str(),
                    path: forest
                        .path_string(&leaf.id, &config.path_separator)
                        .unwrap_or_else(|| leaf.name.clone()),
                    options: tree.options().active_options(&leaf.id),
                });
            }
            groups.push(group);
        }

        Self {
            config,
            columns,
            groups,
        }
    }

    pub fn root_count(&self) -> usize {
        self.groups.len()
    }

    /// Predicted number of combinations, `None` on overflow
    ///
    /// With `p_r` the product of option counts over the leaves of root `r`,
    /// composites over all subsets of size ≥ 2 total `Π(1 + p_r) − 1 − Σ p_r`.
    pub fn count(&self) -> Option<u64> {
        let mut simple: u64 = 0;
        for column in &self.columns {
            simple = simple.checked_add(column.options.len() as u64)?;
        }

        let mut all_subsets: u64 = 1;
        let mut singles: u64 = 0;
        for group in &self.groups {
            let mut p: u64 = 1;
            for &c in group {
                p = p.checked_mul(self.columns[c].options.len() as u64)?;
            }
            all_subsets = all_subsets.checked_mul(p.checked_add(1)?)?;
            singles = singles.checked_add(p)?;
        }
        let composite = all_subsets - 1 - singles;

        simple.checked_add(composite)
    }

    /// Lazily enumerate all combinations
    pub fn iter(&self) -> CombinationIter<'_, 'a> {
        CombinationIter {
            generator: self,
            phase: Phase::Simple {
                column: 0,
                option: 0,
            },
        }
    }

    /// Collect all combinations, deduplicated by option set
    pub fn generate(&self) -> EngineResult<Vec<Combination>> {
        let limit = self.config.max_combinations;
        if limit > 0 {
            let expected = self.count().unwrap_or(u64::MAX);
            if expected > limit as u64 {
                tracing::warn!(expected, limit, "Combination limit exceeded, generation refused");
                return Err(EngineError::TooManyCombinations { expected, limit });
            }
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut duplicates = 0usize;
        for combination in self.iter() {
            if seen.insert(combination.selected_option_ids.clone()) {
                out.push(combination);
            } else {
                duplicates += 1;
                tracing::debug!(key = %combination.selected_option_ids, "Duplicate combination dropped");
            }
        }

        let composite = out.iter().filter(|c| c.is_composite).count();
        tracing::info!(
            roots = self.groups.len(),
            simple = out.len() - composite,
            composite,
            duplicates,
            "Combinations generated"
        );

        Ok(out)
    }

    fn assemble(&self, selection: &[(&Column<'_>, &OptionValue)]) -> Combination {
        assemble(
            selection,
            &self.config.group_separator,
            CombinationOrigin::Automatic,
        )
    }
}

enum Phase {
    Simple {
        column: usize,
        option: usize,
    },
    Composite {
        k: usize,
        subsets: KSubsets,
        active: Option<(Vec<usize>, CartesianProduct)>,
    },
    Done,
}

/// Lazy combination sequence; simple combinations first, then composites by
/// increasing subset size
pub struct CombinationIter<'g, 'a> {
    generator: &'g CombinationGenerator<'a>,
    phase: Phase,
}

impl Iterator for CombinationIter<'_, '_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        let g = self.generator;
        loop {
            match &mut self.phase {
                // With a single root this is the whole enumeration; with
                // several roots it is the simple prefix.
                Phase::Simple { column, option } => {
                    let Some(col) = g.columns.get(*column) else {
                        self.phase = Phase::Composite {
                            k: 2,
                            subsets: KSubsets::new(g.groups.len(), 2),
                            active: None,
                        };
                        continue;
                    };
                    let Some(&opt) = col.options.get(*option) else {
                        *column += 1;
                        *option = 0;
                        continue;
                    };
                    *option += 1;
                    return Some(g.assemble(&[(col, opt)]));
                }
                Phase::Composite { k, subsets, active } => {
                    if let Some((cols, product)) = active {
                        if let Some(tuple) = product.next() {
                            let selection: Vec<(&Column<'_>, &OptionValue)> = cols
                                .iter()
                                .zip(tuple)
                                .map(|(&c, o)| (&g.columns[c], g.columns[c].options[o]))
                                .collect();
                            return Some(g.assemble(&selection));
                        }
                        *active = None;
                    }

                    match subsets.next() {
                        Some(roots) => {
                            let cols: Vec<usize> = roots
                                .iter()
                                .flat_map(|&r| g.groups[r].iter().copied())
                                .collect();
                            let radices = cols.iter().map(|&c| g.columns[c].options.len()).collect();
                            *active = Some((cols, CartesianProduct::new(radices)));
                        }
                        None if *k < g.groups.len() => {
                            *k += 1;
                            *subsets = KSubsets::new(g.groups.len(), *k);
                        }
                        None => self.phase = Phase::Done,
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

/// Generate every combination of `tree`
pub fn generate(tree: &VariationTree, config: &EngineConfig) -> EngineResult<Vec<Combination>> {
    CombinationGenerator::new(tree, config).generate()
}

/// Predicted generation size without enumerating, `None` on overflow
pub fn count_combinations(tree: &VariationTree, config: &EngineConfig) -> Option<u64> {
    CombinationGenerator::new(tree, config).count()
}

/// Build a custom combination from user-picked option ids
///
/// Every option must exist and be active, and no two may share a leaf
/// attribute. The result is active and marked [`CombinationOrigin::Custom`].
pub fn build_custom(
    tree: &VariationTree,
    config: &EngineConfig,
    option_ids: &[String],
) -> EngineResult<Combination> {
    if option_ids.is_empty() {
        return Err(EngineError::EmptySelection);
    }

    let forest = tree.forest();
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut columns = Vec::with_capacity(option_ids.len());

    for id in option_ids {
        let option = tree
            .options()
            .get(id)
            .ok_or_else(|| EngineError::OptionNotFound(id.clone()))?;
        if !option.is_active {
            return Err(EngineError::OptionInactive(id.clone()));
        }
        if let Some(first) = owners.insert(option.attribute_id.as_str(), option.id.as_str()) {
            return Err(EngineError::OptionConflict {
                attribute_id: option.attribute_id.clone(),
                first: first.to_string(),
                second: option.id.clone(),
            });
        }

        let root = forest
            .root_of(&option.attribute_id)
            .ok_or_else(|| EngineError::OptionNotFound(id.clone()))?;
        let path = forest
            .path_string(&option.attribute_id, &config.path_separator)
            .ok_or_else(|| EngineError::OptionNotFound(id.clone()))?;
        columns.push(Column {
            root_id: root.id.as_str(),
            path,
            options: vec![option],
        });
    }

    let selection: Vec<(&Column<'_>, &OptionValue)> =
        columns.iter().map(|c| (c, c.options[0])).collect();
    Ok(assemble(
        &selection,
        &config.group_separator,
        CombinationOrigin::Custom,
    ))
}

fn assemble(
    selection: &[(&Column<'_>, &OptionValue)],
    group_separator: &str,
    origin: CombinationOrigin,
) -> Combination {
    let roots: HashSet<&str> = selection.iter().map(|(c, _)| c.root_id).collect();

    let name = selection
        .iter()
        .map(|(c, o)| format!("{} - {}", c.path, o.name))
        .collect::<Vec<_>>()
        .join(group_separator);

    let price_delta: Decimal = selection.iter().map(|(_, o)| o.price_delta).sum();
    // A composite cannot be sold beyond its scarcest component
    let stock = selection.iter().map(|(_, o)| o.stock).min().unwrap_or(0);

    let (sku, barcode) = match selection {
        [(_, option)] => (option.sku.clone(), option.barcode.clone()),
        _ => {
            let skus: Option<Vec<&str>> = selection.iter().map(|(_, o)| o.sku.as_deref()).collect();
            (skus.map(|s| s.join("-")), None)
        }
    };

    Combination {
        id: new_id(),
        selected_option_ids: CombinationKey::from_ids(selection.iter().map(|(_, o)| o.id.as_str())),
        attribute_paths: selection.iter().map(|(c, _)| c.path.clone()).collect(),
        is_composite: roots.len() >= 2,
        name,
        sku,
        barcode,
        image_url: selection.iter().find_map(|(_, o)| o.image_url.clone()),
        price_delta,
        stock,
        notes: None,
        is_active: origin == CombinationOrigin::Custom,
        origin,
        is_modified: false,
        storage_id: None,
    }
}
