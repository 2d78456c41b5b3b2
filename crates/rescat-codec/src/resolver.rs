//! # Index Resolver
//!
//! Turns the name-based asset graph into integer-indexed tables.
//!
//! ## Algorithm
//!
//! 1. Collect every `(asset name, dependency names)` pair.
//! 2. Sort the pairs by asset name with ordinal (byte-wise) comparison.
//! 3. Reject adjacent equal names. A duplicate would make the lookup in
//!    step 4 return an arbitrary one of the equal entries.
//! 4. Rewrite each dependency name to its position via [`binary_search`].
//!    A name that is not found is a fatal resolution error.
//!
//! Sorting precedes indexing, so the assignment depends only on the set of
//! assets, never on the order they were discovered in.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rescat_core::{Catalog, ResourceKey};
use thiserror::Error;

use crate::model::Asset;

/// Errors raised while resolving names to indexes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Two assets share a name.
    #[error("duplicate asset name {0:?}")]
    DuplicateAsset(String),

    /// A dependency names an asset that is not in the table.
    #[error("asset {asset:?} depends on unknown asset {dependency:?}")]
    UnknownDependency {
        /// The depending asset.
        asset: String,
        /// The missing dependency.
        dependency: String,
    },

    /// A resource lists an asset that is not in the table.
    #[error("resource {resource:?} refers to unknown asset {asset:?}")]
    UnknownAsset {
        /// The owning resource.
        resource: String,
        /// The missing asset.
        asset: String,
    },
}

/// Exact-match binary search over an ordinally sorted slice.
///
/// Iterative over inclusive bounds: check the midpoint, return it on an
/// exact match, continue left when the midpoint compares greater than `key`
/// and right otherwise. Returns `None` when the range empties.
pub fn binary_search<T: AsRef<str>>(sorted: &[T], key: &str) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let mut low = 0usize;
    let mut high = sorted.len() - 1;
    loop {
        let mid = low + (high - low) / 2;
        match sorted[mid].as_ref().cmp(key) {
            Ordering::Equal => return Some(mid),
            Ordering::Greater => {
                if mid == low {
                    return None;
                }
                high = mid - 1;
            }
            Ordering::Less => {
                low = mid + 1;
                if low > high {
                    return None;
                }
            }
        }
    }
}

/// A sorted asset table with dependencies rewritten to indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAssets {
    assets: Vec<Asset>,
}

impl ResolvedAssets {
    /// The sorted asset table.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Take the asset table.
    pub fn into_assets(self) -> Vec<Asset> {
        self.assets
    }

    /// Index of an asset name, if present.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        binary_search(&self.assets, name).map(|i| i as u32)
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Everything the codec needs from a catalog, in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMap {
    /// Sorted asset table.
    pub assets: Vec<Asset>,
    /// Resource keys in table order.
    pub resources: Vec<ResourceKey>,
    /// Per resource, ascending indexes of its own assets.
    pub resource_asset_indexes: Vec<Vec<u32>>,
}

impl BuildMap {
    /// Table index of a resource.
    pub fn resource_index(&self, key: &ResourceKey) -> Option<u32> {
        self.resources
            .binary_search(key)
            .ok()
            .map(|i| i as u32)
    }

    /// Table index of an asset.
    pub fn asset_index(&self, name: &str) -> Option<u32> {
        binary_search(&self.assets, name).map(|i| i as u32)
    }
}

/// Stateless resolver entry points.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexResolver;

impl IndexResolver {
    /// Sort `(name, dependency names)` pairs and resolve dependencies to
    /// indexes, keeping each asset's declared dependency order.
    pub fn resolve<I>(entries: I) -> Result<ResolvedAssets, ResolveError>
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut pairs: Vec<(String, Vec<String>)> = entries.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(dup) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ResolveError::DuplicateAsset(dup[0].0.clone()));
        }

        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        let mut assets = Vec::with_capacity(pairs.len());
        for (name, dependencies) in &pairs {
            let mut indexes = Vec::with_capacity(dependencies.len());
            for dependency in dependencies {
                let index = binary_search(&names, dependency).ok_or_else(|| {
                    ResolveError::UnknownDependency {
                        asset: name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                indexes.push(index as u32);
            }
            assets.push(Asset::new(name.clone(), indexes));
        }
        Ok(ResolvedAssets { assets })
    }

    /// Resolve a whole catalog. Dependency indexes are sorted and
    /// deduplicated per asset; resources follow catalog key order.
    pub fn resolve_catalog(catalog: &Catalog) -> Result<BuildMap, ResolveError> {
        let resolved = Self::resolve(
            catalog
                .assets()
                .map(|a| (a.name.clone(), a.dependencies.clone())),
        )?;
        let mut assets = resolved.into_assets();
        for asset in &mut assets {
            let unique: BTreeSet<u32> = asset.dependency_asset_indexes.drain(..).collect();
            asset.dependency_asset_indexes = unique.into_iter().collect();
        }

        let mut resources = Vec::with_capacity(catalog.resource_count());
        let mut resource_asset_indexes = Vec::with_capacity(catalog.resource_count());
        for resource in catalog.resources() {
            let mut indexes = Vec::with_capacity(resource.assets().len());
            for asset in resource.assets() {
                let index = binary_search(&assets, &asset.name).ok_or_else(|| {
                    ResolveError::UnknownAsset {
                        resource: resource.key().to_string(),
                        asset: asset.name.clone(),
                    }
                })?;
                indexes.push(index as u32);
            }
            indexes.sort_unstable();
            resources.push(resource.key().clone());
            resource_asset_indexes.push(indexes);
        }

        Ok(BuildMap {
            assets,
            resources,
            resource_asset_indexes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescat_core::{AssetGuid, Resource};

    fn pair(name: &str, deps: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            deps.iter().map(|d| d.to_string()).collect(),
        )
    }

    #[test]
    fn binary_search_finds_every_element() {
        let sorted = ["a", "b", "c", "d", "e"];
        for (i, s) in sorted.iter().enumerate() {
            assert_eq!(binary_search(&sorted, s), Some(i));
        }
        assert_eq!(binary_search(&sorted, "0"), None);
        assert_eq!(binary_search(&sorted, "bb"), None);
        assert_eq!(binary_search(&sorted, "z"), None);
    }

    #[test]
    fn binary_search_empty_and_single() {
        let empty: [&str; 0] = [];
        assert_eq!(binary_search(&empty, "a"), None);
        assert_eq!(binary_search(&["m"], "m"), Some(0));
        assert_eq!(binary_search(&["m"], "a"), None);
        assert_eq!(binary_search(&["m"], "z"), None);
    }

    #[test]
    fn ordinal_comparison_is_case_sensitive() {
        // Uppercase sorts before lowercase in byte order.
        let resolved = IndexResolver::resolve(vec![pair("b", &[]), pair("B", &[])]).unwrap();
        assert_eq!(resolved.assets()[0].name, "B");
        assert_eq!(resolved.assets()[1].name, "b");
    }

    #[test]
    fn resolve_sorts_and_rewrites_dependencies() {
        let resolved = IndexResolver::resolve(vec![
            pair("z.png", &[]),
            pair("a.mat", &["z.png", "m.shader"]),
            pair("m.shader", &[]),
        ])
        .unwrap();
        let names: Vec<&str> = resolved.assets().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["a.mat", "m.shader", "z.png"]);
        assert_eq!(resolved.assets()[0].dependency_asset_indexes, vec![2, 1]);
        assert_eq!(resolved.index_of("m.shader"), Some(1));
        assert_eq!(resolved.index_of("nope"), None);
    }

    #[test]
    fn resolve_rejects_duplicates() {
        let err = IndexResolver::resolve(vec![pair("a", &[]), pair("b", &[]), pair("a", &[])])
            .unwrap_err();
        assert_eq!(err, ResolveError::DuplicateAsset("a".into()));
    }

    #[test]
    fn resolve_rejects_unknown_dependency() {
        let err = IndexResolver::resolve(vec![pair("a", &["ghost"])]).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownDependency { .. }));
    }

    fn catalog(order: &[(&str, &[&str])]) -> Catalog {
        let mut catalog = Catalog::new();
        for (resource, assets) in order {
            let key = ResourceKey::parse(resource, None).unwrap();
            catalog.add_resource(Resource::new(key.clone())).unwrap();
            for name in *assets {
                let asset = rescat_core::Asset::new(AssetGuid::random(), *name);
                catalog.add_asset(&key, asset).unwrap();
            }
        }
        catalog
    }

    #[test]
    fn catalog_resolution_is_insertion_order_independent() {
        let mut first = catalog(&[("ui", &["b", "a"][..]), ("core", &["c"][..])]);
        first
            .set_dependencies("a", vec!["c".into(), "b".into(), "c".into()])
            .unwrap();
        let mut second = catalog(&[("core", &["c"][..]), ("ui", &["a", "b"][..])]);
        second
            .set_dependencies("a", vec!["b".into(), "c".into()])
            .unwrap();

        let left = IndexResolver::resolve_catalog(&first).unwrap();
        let right = IndexResolver::resolve_catalog(&second).unwrap();
        assert_eq!(left, right);
        assert_eq!(left.assets[0].dependency_asset_indexes, vec![1, 2]);
        assert_eq!(left.resource_asset_indexes, vec![vec![2], vec![0, 1]]);
    }

    #[test]
    fn build_map_lookups() {
        let map = IndexResolver::resolve_catalog(&catalog(&[("a", &["x"][..]), ("b", &["y"][..])])).unwrap();
        let b = ResourceKey::parse("b", None).unwrap();
        assert_eq!(map.resource_index(&b), Some(1));
        assert_eq!(map.asset_index("y"), Some(1));
        assert_eq!(map.asset_index("q"), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The search agrees with a linear scan, present or absent.
        #[test]
        fn binary_search_matches_linear_scan(
            names in prop::collection::btree_set("[a-z]{1,6}", 0..60),
            needle in "[a-z]{1,6}",
        ) {
            let sorted: Vec<String> = names.into_iter().collect();
            for (i, name) in sorted.iter().enumerate() {
                prop_assert_eq!(binary_search(&sorted, name), Some(i));
            }
            let linear = sorted.iter().position(|s| *s == needle);
            prop_assert_eq!(binary_search(&sorted, &needle), linear);
        }

        /// Shuffling the input never changes the resolved table.
        #[test]
        fn resolve_is_permutation_invariant(
            names in prop::collection::btree_set("[a-z]{1,4}", 1..20),
            seed in any::<u64>(),
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let entries: Vec<(String, Vec<String>)> = names
                .iter()
                .enumerate()
                .map(|(i, n)| (n.clone(), vec![names[(i * 7 + 3) % names.len()].clone()]))
                .collect();
            let mut shuffled = entries.clone();
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
            prop_assert_eq!(
                IndexResolver::resolve(entries).unwrap(),
                IndexResolver::resolve(shuffled).unwrap()
            );
        }
    }
}
