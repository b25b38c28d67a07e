//! Index mapping from a local manifold into a global product manifold.
//!
//! A function is declared on a local manifold, possibly a product and
//! possibly restricted to some coordinates of its factors. The global
//! manifold is a product whose elementary factors include every factor of
//! the local manifold. [`IndexMap`] records, for each local factor (or
//! restricted piece of one), where its coordinates sit in the local input
//! of the function and in the global point, both in ambient and in tangent
//! coordinates.
//!
//! Restriction entries name the factor they apply to. Walking the local
//! factors in order, each occurrence of a factor takes the next entry
//! aimed at it, and its last occurrence takes every remaining one. An
//! occurrence without entries is mapped whole. The pieces of one factor
//! never overlap.

use manimap_core::{
    config::{MapConfig, RestrictionPolicy},
    error::{MapError, Result},
    manifold::{elementary_factors, same_manifold, ManifoldRef},
    types::{DMatrix, DVector, Scalar},
};
use std::ops::Range;
use tracing::{trace, warn};

/// A contiguous range of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// First coordinate
    pub start: usize,
    /// Number of coordinates
    pub len: usize,
}

impl Span {
    /// Creates the span `start..start + len`.
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last coordinate.
    pub const fn end(self) -> usize {
        self.start + self.len
    }

    /// The span as a range.
    pub const fn range(self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// One `(start, len)` entry of a restriction, aimed at a factor.
#[derive(Debug, Clone)]
pub struct RestrictionEntry<T: Scalar> {
    /// Elementary factor the entry applies to
    pub manifold: ManifoldRef<T>,
    /// First kept coordinate, relative to the factor
    pub start: usize,
    /// Number of kept coordinates
    pub len: usize,
}

/// Sub-ranges of factors a function actually depends on.
///
/// An empty restriction keeps every coordinate.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use manimap::mapper::Restriction;
/// use manimap_core::manifold::ManifoldRef;
/// use manimap_manifolds::RealSpace;
///
/// let r39: ManifoldRef<f64> = Arc::new(RealSpace::new(39));
/// let restriction = Restriction::on(&r39, 14, 3).and(&r39, 27, 10);
/// assert_eq!(restriction.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Restriction<T: Scalar> {
    entries: Vec<RestrictionEntry<T>>,
}

impl<T: Scalar> Restriction<T> {
    /// Keeps every coordinate.
    pub fn none() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Keeps coordinates `start..start + len` of `manifold`.
    pub fn on(manifold: &ManifoldRef<T>, start: usize, len: usize) -> Self {
        Self::none().and(manifold, start, len)
    }

    /// Adds an entry.
    #[must_use]
    pub fn and(mut self, manifold: &ManifoldRef<T>, start: usize, len: usize) -> Self {
        self.push(manifold, start, len);
        self
    }

    /// Adds an entry in place.
    pub fn push(&mut self, manifold: &ManifoldRef<T>, start: usize, len: usize) {
        self.entries.push(RestrictionEntry {
            manifold: ManifoldRef::clone(manifold),
            start,
            len,
        });
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[RestrictionEntry<T>] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when every coordinate is kept.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Scalar> Default for Restriction<T> {
    fn default() -> Self {
        Self::none()
    }
}

/// Placement of one local factor, or of one restricted piece of it.
#[derive(Debug, Clone)]
pub struct MappedSegment<T: Scalar> {
    /// Elementary factor the segment belongs to
    pub manifold: ManifoldRef<T>,
    /// Coordinates in the function's input
    pub local_ambient: Span,
    /// Coordinates in the global point
    pub global_ambient: Span,
    /// Coordinates in the function's tangent space
    pub local_tangent: Span,
    /// Coordinates in the global tangent space
    pub global_tangent: Span,
    /// Whether ambient and tangent coordinates coincide
    pub flat: bool,
}

/// Destination of a block of derivative columns.
///
/// `local` addresses columns of a function's derivative, `global` the
/// columns they land in. When `chart` is present the local columns are
/// ambient coordinates and are multiplied by the chart differential
/// (`local.len x global.len`) on the way.
#[derive(Debug, Clone)]
pub struct ColumnBlock<T: Scalar> {
    /// Columns in the local derivative
    pub local: Span,
    /// Columns in the global derivative
    pub global: Span,
    /// Chart differential of a curved segment
    pub chart: Option<DMatrix<T>>,
}

/// Coordinates in which a function reports its derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeCoordinates {
    /// One column per input coordinate; curved segments need a pull-back.
    Ambient,
    /// One column per tangent coordinate.
    Tangent,
}

/// Mapping of a local manifold into a global product manifold.
#[derive(Debug, Clone)]
pub struct IndexMap<T: Scalar> {
    segments: Vec<MappedSegment<T>>,
    local_ambient_size: usize,
    local_tangent_size: usize,
    global_ambient_size: usize,
    global_tangent_size: usize,
}

impl<T: Scalar> IndexMap<T> {
    /// Maps `local`, restricted by `restriction`, into `global`.
    pub fn new(
        local: &ManifoldRef<T>,
        global: &ManifoldRef<T>,
        restriction: &Restriction<T>,
        config: &MapConfig,
    ) -> Result<Self> {
        let mut placed = Vec::new();
        let (mut ambient, mut tangent) = (0, 0);
        for leaf in elementary_factors(global) {
            let (rep, tan) = (leaf.representation_dimension(), leaf.tangent_dimension());
            placed.push((leaf, ambient, tangent));
            ambient += rep;
            tangent += tan;
        }

        let local_leaves = elementary_factors(local);
        for entry in restriction.entries() {
            if !local_leaves.iter().any(|m| same_manifold(m, &entry.manifold)) {
                return Err(MapError::invalid_restriction(
                    entry.manifold.name(),
                    format!("not a factor of {}", local.name()),
                ));
            }
        }

        let mut map = Self {
            segments: Vec::with_capacity(local_leaves.len()),
            local_ambient_size: 0,
            local_tangent_size: 0,
            global_ambient_size: ambient,
            global_tangent_size: tangent,
        };

        for (index, leaf) in local_leaves.iter().enumerate() {
            let Some(&(_, global_ambient, global_tangent)) =
                placed.iter().find(|(m, _, _)| same_manifold(m, leaf))
            else {
                return Err(MapError::manifold_not_contained(leaf.name(), global.name()));
            };

            let entries = entries_for_occurrence(&local_leaves, index, restriction);
            let flat = leaf.is_flat();
            if entries.is_empty() {
                map.push(
                    leaf,
                    Span::new(0, leaf.representation_dimension()),
                    Span::new(0, leaf.tangent_dimension()),
                    global_ambient,
                    global_tangent,
                    flat,
                )?;
                continue;
            }
            if !flat {
                return Err(MapError::invalid_restriction(
                    leaf.name(),
                    "only manifolds whose ambient and tangent coordinates coincide can be restricted",
                ));
            }
            for entry in entries {
                let span = checked_span(leaf, entry, config)?;
                map.push(leaf, span, span, global_ambient, global_tangent, true)?;
            }
        }

        Ok(map)
    }

    fn push(
        &mut self,
        manifold: &ManifoldRef<T>,
        ambient: Span,
        tangent: Span,
        global_ambient: usize,
        global_tangent: usize,
        flat: bool,
    ) -> Result<()> {
        let segment = MappedSegment {
            manifold: ManifoldRef::clone(manifold),
            local_ambient: Span::new(self.local_ambient_size, ambient.len),
            global_ambient: Span::new(global_ambient + ambient.start, ambient.len),
            local_tangent: Span::new(self.local_tangent_size, tangent.len),
            global_tangent: Span::new(global_tangent + tangent.start, tangent.len),
            flat,
        };
        trace!(
            manifold = manifold.name(),
            local = ?segment.local_tangent,
            global = ?segment.global_tangent,
            "mapped segment"
        );
        if let Some(other) = self.segments.iter().find(|s| {
            same_manifold(&s.manifold, manifold) && overlaps(s.global_ambient, segment.global_ambient)
        }) {
            let taken = other.global_ambient.start - global_ambient;
            return Err(MapError::invalid_restriction(
                manifold.name(),
                format!(
                    "coordinates {:?} overlap {:?}",
                    ambient.range(),
                    Span::new(taken, other.global_ambient.len).range()
                ),
            ));
        }
        self.local_ambient_size += ambient.len;
        self.local_tangent_size += tangent.len;
        self.segments.push(segment);
        Ok(())
    }

    /// Segments in local order.
    pub fn segments(&self) -> &[MappedSegment<T>] {
        &self.segments
    }

    /// Global tangent ranges of the local tangent coordinates, in order.
    pub fn tangent_ranges(&self) -> Vec<Span> {
        self.segments.iter().map(|s| s.global_tangent).collect()
    }

    /// Global ambient ranges of the local input coordinates, in order.
    pub fn ambient_ranges(&self) -> Vec<Span> {
        self.segments.iter().map(|s| s.global_ambient).collect()
    }

    /// Number of input coordinates of a function on the local manifold.
    pub fn local_ambient_size(&self) -> usize {
        self.local_ambient_size
    }

    /// Number of tangent coordinates of the (restricted) local manifold.
    pub fn local_tangent_size(&self) -> usize {
        self.local_tangent_size
    }

    /// Representation dimension of the global manifold.
    pub fn global_ambient_size(&self) -> usize {
        self.global_ambient_size
    }

    /// Tangent dimension of the global manifold.
    pub fn global_tangent_size(&self) -> usize {
        self.global_tangent_size
    }

    /// Returns true if no segment needs a chart pull-back.
    pub fn is_flat(&self) -> bool {
        self.segments.iter().all(|s| s.flat)
    }

    /// Copies the local coordinates of the global point `x` into `local`.
    pub fn gather(&self, x: &DVector<T>, local: &mut DVector<T>) -> Result<()> {
        if x.len() != self.global_ambient_size {
            return Err(MapError::dimension_mismatch(
                "global point",
                self.global_ambient_size,
                x.len(),
            ));
        }
        if local.len() != self.local_ambient_size {
            return Err(MapError::dimension_mismatch(
                "local point",
                self.local_ambient_size,
                local.len(),
            ));
        }
        for segment in &self.segments {
            let (l, g) = (segment.local_ambient, segment.global_ambient);
            local.rows_mut(l.start, l.len).copy_from(&x.rows(g.start, g.len));
        }
        Ok(())
    }

    /// Writes per-input-coordinate values into their global positions.
    ///
    /// `values` may be shorter than the local input; the remaining global
    /// positions are left untouched.
    pub fn place<U: Clone>(&self, values: &[U], global: &mut [U]) {
        for segment in &self.segments {
            let (l, g) = (segment.local_ambient, segment.global_ambient);
            if l.start >= values.len() {
                break;
            }
            let n = l.len.min(values.len() - l.start);
            global[g.start..g.start + n].clone_from_slice(&values[l.start..l.start + n]);
        }
    }

    /// Column destinations for a derivative evaluated at the local point.
    pub fn column_blocks(
        &self,
        local: &DVector<T>,
        coordinates: DerivativeCoordinates,
    ) -> Result<Vec<ColumnBlock<T>>> {
        self.segments
            .iter()
            .map(|segment| match coordinates {
                DerivativeCoordinates::Ambient if !segment.flat => {
                    let l = segment.local_ambient;
                    let chart = segment.manifold.differential(local.rows(l.start, l.len))?;
                    Ok(ColumnBlock {
                        local: l,
                        global: segment.global_tangent,
                        chart: Some(chart),
                    })
                }
                DerivativeCoordinates::Ambient => Ok(ColumnBlock {
                    local: segment.local_ambient,
                    global: segment.global_tangent,
                    chart: None,
                }),
                DerivativeCoordinates::Tangent => Ok(ColumnBlock {
                    local: segment.local_tangent,
                    global: segment.global_tangent,
                    chart: None,
                }),
            })
            .collect()
    }
}

/// Restriction entries consumed by occurrence `index` of a local factor.
fn entries_for_occurrence<'a, T: Scalar>(
    leaves: &[ManifoldRef<T>],
    index: usize,
    restriction: &'a Restriction<T>,
) -> Vec<&'a RestrictionEntry<T>> {
    let leaf = &leaves[index];
    let occurrence = leaves[..index].iter().filter(|m| same_manifold(m, leaf)).count();
    let last = leaves[index + 1..].iter().all(|m| !same_manifold(m, leaf));
    let aimed = restriction
        .entries()
        .iter()
        .filter(|e| same_manifold(&e.manifold, leaf));
    if last {
        aimed.skip(occurrence).collect()
    } else {
        aimed.skip(occurrence).take(1).collect()
    }
}

fn overlaps(a: Span, b: Span) -> bool {
    a.start < b.end() && b.start < a.end()
}

fn checked_span<T: Scalar>(
    leaf: &ManifoldRef<T>,
    entry: &RestrictionEntry<T>,
    config: &MapConfig,
) -> Result<Span> {
    if entry.len == 0 {
        return Err(MapError::EmptyRestriction {
            manifold: leaf.name().to_string(),
            start: entry.start,
        });
    }
    let dimension = leaf.tangent_dimension();
    let end = entry.start.saturating_add(entry.len);
    if end <= dimension {
        return Ok(Span::new(entry.start, entry.len));
    }
    match config.restriction_policy {
        RestrictionPolicy::Reject => Err(MapError::invalid_restriction(
            leaf.name(),
            format!("range {}..{end} exceeds dimension {dimension}", entry.start),
        )),
        RestrictionPolicy::Clip if entry.start >= dimension => Err(MapError::invalid_restriction(
            leaf.name(),
            format!("start {} is past dimension {dimension}", entry.start),
        )),
        RestrictionPolicy::Clip => {
            let len = dimension - entry.start;
            warn!(
                manifold = leaf.name(),
                start = entry.start,
                requested = entry.len,
                kept = len,
                "restriction clipped to manifold span"
            );
            Ok(Span::new(entry.start, len))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manimap_core::config::MapConfigBuilder;
    use manimap_manifolds::{CartesianProduct, RealSpace, SO3};
    use std::sync::Arc;

    fn real(n: usize, name: &str) -> ManifoldRef<f64> {
        Arc::new(RealSpace::with_name(n, name))
    }

    fn so3() -> ManifoldRef<f64> {
        Arc::new(SO3::new())
    }

    #[test]
    fn test_factor_of_product() {
        let pos = real(3, "pos");
        let ori = so3();
        let joints = real(10, "joints");
        let global = CartesianProduct::new(vec![pos.clone(), ori.clone(), joints.clone()]).into_ref();

        let map = IndexMap::new(&joints, &global, &Restriction::none(), &MapConfig::default()).unwrap();
        assert_eq!(map.tangent_ranges(), vec![Span::new(6, 10)]);
        assert_eq!(map.ambient_ranges(), vec![Span::new(12, 10)]);
        assert_eq!(map.local_ambient_size(), 10);
        assert_eq!((map.global_ambient_size(), map.global_tangent_size()), (22, 16));

        let map = IndexMap::new(&ori, &global, &Restriction::none(), &MapConfig::default()).unwrap();
        assert_eq!(map.tangent_ranges(), vec![Span::new(3, 3)]);
        assert_eq!(map.ambient_ranges(), vec![Span::new(3, 9)]);
        assert!(!map.is_flat());
    }

    #[test]
    fn test_restriction_ranges() {
        let r39 = real(39, "r39");
        let global = CartesianProduct::new(vec![real(5, "pad"), r39.clone()]).into_ref();
        let restriction = Restriction::on(&r39, 14, 3).and(&r39, 27, 10);

        let map = IndexMap::new(&r39, &global, &restriction, &MapConfig::default()).unwrap();
        assert_eq!(map.tangent_ranges(), vec![Span::new(19, 3), Span::new(32, 10)]);
        assert_eq!(map.local_tangent_size(), 13);
        assert_eq!(map.segments()[1].local_ambient, Span::new(3, 10));
    }

    #[test]
    fn test_repeated_factor_consumes_entries_in_order() {
        let r42 = real(42, "r42");
        let ori = so3();
        let local = CartesianProduct::new(vec![r42.clone(), ori.clone(), r42.clone()]).into_ref();
        let global = CartesianProduct::new(vec![ori.clone(), r42.clone()]).into_ref();
        let restriction = Restriction::on(&r42, 14, 3).and(&r42, 27, 10);

        let map = IndexMap::new(&local, &global, &restriction, &MapConfig::default()).unwrap();
        assert_eq!(map.local_ambient_size(), 3 + 9 + 10);
        assert_eq!(map.local_tangent_size(), 3 + 3 + 10);
        assert_eq!(
            map.tangent_ranges(),
            vec![Span::new(3 + 14, 3), Span::new(0, 3), Span::new(3 + 27, 10)]
        );
    }

    #[test]
    fn test_last_occurrence_takes_remaining_entries() {
        let r = real(20, "r");
        let local = CartesianProduct::new(vec![r.clone(), r.clone()]).into_ref();
        let restriction = Restriction::on(&r, 0, 2).and(&r, 5, 1).and(&r, 10, 4);

        let map = IndexMap::new(&local, &r, &restriction, &MapConfig::default()).unwrap();
        assert_eq!(
            map.tangent_ranges(),
            vec![Span::new(0, 2), Span::new(5, 1), Span::new(10, 4)]
        );
        assert_eq!(map.local_ambient_size(), 7);
    }

    #[test]
    fn test_missing_factor() {
        let global = CartesianProduct::new(vec![real(3, "a")]).into_ref();
        let err = IndexMap::new(&real(3, "b"), &global, &Restriction::none(), &MapConfig::default())
            .unwrap_err();
        assert_eq!(err, MapError::manifold_not_contained("b", "a"));
    }

    #[test]
    fn test_invalid_restrictions() {
        let r = real(10, "r");
        let ori = so3();
        let global = CartesianProduct::new(vec![r.clone(), ori.clone()]).into_ref();
        let config = MapConfig::default();

        let err = IndexMap::new(&r, &global, &Restriction::on(&r, 4, 0), &config).unwrap_err();
        assert!(matches!(err, MapError::EmptyRestriction { start: 4, .. }));

        let err = IndexMap::new(&ori, &global, &Restriction::on(&ori, 0, 1), &config).unwrap_err();
        assert!(matches!(err, MapError::InvalidRestriction { .. }));

        let err = IndexMap::new(&r, &global, &Restriction::on(&ori, 0, 1), &config).unwrap_err();
        assert!(matches!(err, MapError::InvalidRestriction { .. }));
    }

    #[test]
    fn test_overlapping_pieces_are_rejected() {
        let r = real(10, "r");
        let config = MapConfig::default();

        let err = IndexMap::new(&r, &r, &Restriction::on(&r, 0, 5).and(&r, 3, 5), &config)
            .unwrap_err();
        assert_eq!(err, MapError::invalid_restriction("r", "coordinates 3..8 overlap 0..5"));

        let twice = CartesianProduct::new(vec![r.clone(), r.clone()]).into_ref();
        let err = IndexMap::new(&twice, &r, &Restriction::none(), &config).unwrap_err();
        assert!(matches!(err, MapError::InvalidRestriction { .. }));

        let touching = IndexMap::new(&r, &r, &Restriction::on(&r, 0, 5).and(&r, 5, 5), &config);
        assert_eq!(
            touching.unwrap().tangent_ranges(),
            vec![Span::new(0, 5), Span::new(5, 5)]
        );
    }

    #[test]
    fn test_overflow_policy() {
        let r = real(10, "r");
        let restriction = Restriction::on(&r, 8, 5);

        let clipped = IndexMap::new(&r, &r, &restriction, &MapConfig::default()).unwrap();
        assert_eq!(clipped.tangent_ranges(), vec![Span::new(8, 2)]);

        let reject = MapConfigBuilder::new()
            .restriction_policy(RestrictionPolicy::Reject)
            .build();
        assert!(IndexMap::new(&r, &r, &restriction, &reject).is_err());
        assert!(IndexMap::new(&r, &r, &Restriction::on(&r, 10, 1), &MapConfig::default()).is_err());
    }

    #[test]
    fn test_gather_and_place() {
        let a = real(2, "a");
        let b = real(3, "b");
        let global = CartesianProduct::new(vec![a.clone(), b.clone()]).into_ref();
        let map = IndexMap::new(&b, &global, &Restriction::on(&b, 1, 2), &MapConfig::default()).unwrap();

        let x = DVector::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let mut local = DVector::zeros(2);
        map.gather(&x, &mut local).unwrap();
        assert_eq!(local, DVector::from_vec(vec![3.0, 4.0]));
        assert!(map.gather(&local, &mut local.clone()).is_err());

        let mut global_values = vec![0; 5];
        map.place(&[7], &mut global_values);
        assert_eq!(global_values, vec![0, 0, 0, 7, 0]);
    }

    #[test]
    fn test_column_blocks() {
        let r = real(2, "r");
        let ori = so3();
        let local = CartesianProduct::new(vec![ori.clone(), r.clone()]).into_ref();
        let global = CartesianProduct::new(vec![r.clone(), ori.clone()]).into_ref();
        let map = IndexMap::new(&local, &global, &Restriction::none(), &MapConfig::default()).unwrap();

        let mut x = DVector::zeros(11);
        x.rows_mut(0, 9).copy_from(&SO3::identity_point::<f64>());
        let ambient = map.column_blocks(&x, DerivativeCoordinates::Ambient).unwrap();
        assert_eq!(ambient[0].local, Span::new(0, 9));
        assert_eq!(ambient[0].global, Span::new(2, 3));
        assert_eq!(ambient[0].chart.as_ref().map(|d| d.shape()), Some((9, 3)));
        assert!(ambient[1].chart.is_none());

        let tangent = map.column_blocks(&x, DerivativeCoordinates::Tangent).unwrap();
        assert_eq!(tangent[1].local, Span::new(3, 2));
        assert_eq!(tangent[1].global, Span::new(0, 2));
    }
}
