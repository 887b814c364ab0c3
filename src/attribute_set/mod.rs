//! Attribute sets: a closed family of possibly infinite value sets.
//!
//! Nodes and edges carry maps from attribute names to [`AttributeSet`]
//! values. The variant family `{Empty, Universal, Finite, Integers, Regex}`
//! is closed under union, intersection and difference (lifting across
//! variants where a faithful representation exists), forms a bounded lattice
//! under inclusion, and keeps a canonical form after every operation:
//! finite sets are deduplicated `BTreeSet`s, integer sets are merged sorted
//! intervals, and an operation whose result is empty collapses to `Empty`.
//!
//! Cross-variant combinations without a faithful representation fail with
//! [`AttributeSetError::IncompatibleVariants`]; nothing is silently coerced.
//!
//! # Citations
//! - Lattice theory: Birkhoff, "Lattice Theory" (1940)
//! - Regular-language closure properties: Hopcroft & Ullman (1979)

pub mod integers;
pub mod regex;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use integers::{Endpoint, IntegerSet};
pub use regex::RegexSet;

/// A comparable atomic value inside finite attribute sets.
///
/// The derived order (variant order, then value) is total and gives every
/// finite set a canonical element order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Atom {
    /// Boolean atom.
    Bool(bool),
    /// Integer atom.
    Int(i64),
    /// String atom.
    Str(String),
}

impl Atom {
    /// The integer payload, if this is an integer atom.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Atom::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string payload, if this is a string atom.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Bool(b) => write!(f, "{}", b),
            Atom::Int(i) => write!(f, "{}", i),
            Atom::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Atom::Bool(value)
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Int(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Str(value.to_string())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Atom::Str(value)
    }
}

/// Error type for attribute-set operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSetError {
    /// Two variants cannot be combined faithfully by the given operation.
    IncompatibleVariants {
        /// Variant name of the left operand.
        left: &'static str,
        /// Variant name of the right operand.
        right: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },
    /// A regular expression failed to compile.
    MalformedRegex {
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
    /// Complement is undefined for this variant without a universe.
    UndefinedComplement(&'static str),
}

impl fmt::Display for AttributeSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeSetError::IncompatibleVariants {
                left,
                right,
                operation,
            } => write!(
                f,
                "cannot compute {} of {} and {}: no faithful common variant",
                operation, left, right
            ),
            AttributeSetError::MalformedRegex { pattern, reason } => {
                write!(f, "malformed regex '{}': {}", pattern, reason)
            }
            AttributeSetError::UndefinedComplement(variant) => {
                write!(f, "complement is undefined for {} without a universe", variant)
            }
        }
    }
}

impl std::error::Error for AttributeSetError {}

/// A possibly infinite set of attribute values.
///
/// # Invariants
/// - `Finite` never holds an empty set (it collapses to `Empty`).
/// - `Integers` never holds an empty interval list.
/// - `Regex` never denotes the empty language when produced by an operation
///   of this module (callers may still construct such a value directly via
///   [`AttributeSet::regex`], which normalizes it away).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeSet {
    /// The empty set.
    Empty,
    /// The set of all values.
    Universal,
    /// A finite set of atoms.
    Finite(BTreeSet<Atom>),
    /// A set of integers given by disjoint closed intervals.
    Integers(IntegerSet),
    /// A set of strings given by a regular expression.
    Regex(RegexSet),
}

impl Default for AttributeSet {
    fn default() -> Self {
        AttributeSet::Empty
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeSet::Empty => write!(f, "∅"),
            AttributeSet::Universal => write!(f, "𝒰"),
            AttributeSet::Finite(atoms) => {
                let parts: Vec<String> = atoms.iter().map(|a| a.to_string()).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            AttributeSet::Integers(set) => write!(f, "{}", set),
            AttributeSet::Regex(set) => write!(f, "{}", set),
        }
    }
}

impl AttributeSet {
    /// The empty set.
    #[inline]
    pub fn empty() -> Self {
        AttributeSet::Empty
    }

    /// The universal set.
    #[inline]
    pub fn universal() -> Self {
        AttributeSet::Universal
    }

    /// A finite set of atoms; the empty collection collapses to `Empty`.
    pub fn finite(atoms: impl IntoIterator<Item = Atom>) -> Self {
        let set: BTreeSet<Atom> = atoms.into_iter().collect();
        if set.is_empty() {
            AttributeSet::Empty
        } else {
            AttributeSet::Finite(set)
        }
    }

    /// A finite set of string atoms.
    pub fn strings<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        Self::finite(values.into_iter().map(Atom::from))
    }

    /// A finite set of integer atoms.
    pub fn ints(values: impl IntoIterator<Item = i64>) -> Self {
        Self::finite(values.into_iter().map(Atom::from))
    }

    /// An integer-interval set; the empty set collapses to `Empty`.
    pub fn integers(set: IntegerSet) -> Self {
        if set.is_empty() {
            AttributeSet::Empty
        } else {
            AttributeSet::Integers(set)
        }
    }

    /// A regular-expression set; patterns denoting the empty language
    /// collapse to `Empty`.
    pub fn regex(pattern: &str) -> Result<Self, AttributeSetError> {
        let set = RegexSet::new(pattern)?;
        if set.is_empty() {
            Ok(AttributeSet::Empty)
        } else {
            Ok(AttributeSet::Regex(set))
        }
    }

    /// The variant name, for diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            AttributeSet::Empty => "EmptySet",
            AttributeSet::Universal => "UniversalSet",
            AttributeSet::Finite(_) => "FiniteSet",
            AttributeSet::Integers(_) => "IntegerSet",
            AttributeSet::Regex(_) => "RegexSet",
        }
    }

    /// Atom membership test.
    pub fn contains(&self, atom: &Atom) -> bool {
        match self {
            AttributeSet::Empty => false,
            AttributeSet::Universal => true,
            AttributeSet::Finite(atoms) => atoms.contains(atom),
            AttributeSet::Integers(set) => match atom {
                Atom::Int(i) => set.contains(*i),
                _ => false,
            },
            AttributeSet::Regex(set) => match atom {
                Atom::Str(s) => set.accepts(s),
                _ => false,
            },
        }
    }

    /// Whether the set has no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeSet::Empty => true,
            AttributeSet::Universal => false,
            AttributeSet::Finite(atoms) => atoms.is_empty(),
            AttributeSet::Integers(set) => set.is_empty(),
            AttributeSet::Regex(set) => set.is_empty(),
        }
    }

    /// Whether the set is the universal set.
    ///
    /// Structural for `Universal`; `Integers` covering all of ℤ and `Regex`
    /// accepting every string are proper subsets of the universal value set
    /// (they miss the other atom kinds) and report `false`.
    #[inline]
    pub fn is_universal(&self) -> bool {
        matches!(self, AttributeSet::Universal)
    }

    /// Decidable inclusion test, sound and complete for every expressible
    /// pair of variants.
    pub fn is_subset(&self, other: &AttributeSet) -> bool {
        use AttributeSet::*;
        match (self, other) {
            (Empty, _) => true,
            (x, Empty) => x.is_empty(),
            (_, Universal) => true,
            (Universal, x) => x.is_universal(),
            (Finite(a), Finite(b)) => a.is_subset(b),
            (Finite(a), Integers(b)) => a.iter().all(|atom| match atom {
                Atom::Int(i) => b.contains(*i),
                _ => false,
            }),
            (Finite(a), Regex(b)) => a.iter().all(|atom| match atom {
                Atom::Str(s) => b.accepts(s),
                _ => false,
            }),
            (Integers(a), Integers(b)) => a.is_subset(b),
            (Integers(a), Finite(b)) => match a.iter_finite() {
                Some(members) => members.iter().all(|&i| b.contains(&Atom::Int(i))),
                None => false,
            },
            (Regex(a), Regex(b)) => a.is_subset(b),
            (Regex(a), Finite(b)) => {
                let literals: Vec<&str> = b.iter().filter_map(|atom| atom.as_str()).collect();
                if literals.is_empty() {
                    a.is_empty()
                } else {
                    match RegexSet::from_literals(literals) {
                        Ok(rhs) => a.is_subset(&rhs),
                        Err(_) => false,
                    }
                }
            }
            // Integer sets and regex sets share no atoms.
            (Integers(a), Regex(_)) => a.is_empty(),
            (Regex(a), Integers(_)) => a.is_empty(),
        }
    }

    /// Lattice equality: mutual inclusion.
    pub fn equals(&self, other: &AttributeSet) -> bool {
        self.is_subset(other) && other.is_subset(self)
    }

    /// Set union, lifted to the most general faithful variant.
    pub fn union(&self, other: &AttributeSet) -> Result<AttributeSet, AttributeSetError> {
        use AttributeSet::*;
        match (self, other) {
            (Empty, x) | (x, Empty) => Ok(x.clone()),
            (Universal, _) | (_, Universal) => Ok(Universal),
            (Finite(a), Finite(b)) => Ok(AttributeSet::finite(a.iter().chain(b.iter()).cloned())),
            (Integers(a), Integers(b)) => Ok(AttributeSet::integers(a.union(b))),
            (Regex(a), Regex(b)) => Ok(Regex(a.union(b)?)),
            (Finite(atoms), Integers(set)) | (Integers(set), Finite(atoms)) => {
                let ints = all_ints(atoms, "union", "IntegerSet")?;
                Ok(AttributeSet::integers(set.union(&IntegerSet::from_ints(ints))))
            }
            (Finite(atoms), Regex(set)) | (Regex(set), Finite(atoms)) => {
                let strings = all_strings(atoms, "union", "RegexSet")?;
                Ok(Regex(set.union(&RegexSet::from_literals(strings)?)?))
            }
            (Integers(_), Regex(_)) | (Regex(_), Integers(_)) => {
                Err(AttributeSetError::IncompatibleVariants {
                    left: self.variant_name(),
                    right: other.variant_name(),
                    operation: "union",
                })
            }
        }
    }

    /// Set intersection.
    pub fn intersection(&self, other: &AttributeSet) -> Result<AttributeSet, AttributeSetError> {
        use AttributeSet::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Ok(Empty),
            (Universal, x) | (x, Universal) => Ok(x.clone()),
            (Finite(a), Finite(b)) => {
                Ok(AttributeSet::finite(a.intersection(b).cloned()))
            }
            (Integers(a), Integers(b)) => Ok(AttributeSet::integers(a.intersection(b))),
            (Regex(a), Regex(b)) => Ok(match a.intersection(b)? {
                Some(set) => Regex(set),
                None => Empty,
            }),
            (Finite(atoms), other_set) | (other_set, Finite(atoms)) => Ok(AttributeSet::finite(
                atoms
                    .iter()
                    .filter(|atom| other_set.contains(atom))
                    .cloned(),
            )),
            (Integers(_), Regex(_)) | (Regex(_), Integers(_)) => Ok(Empty),
        }
    }

    /// Set difference `self ∖ other`.
    pub fn difference(&self, other: &AttributeSet) -> Result<AttributeSet, AttributeSetError> {
        use AttributeSet::*;
        match (self, other) {
            (Empty, _) => Ok(Empty),
            (x, Empty) => Ok(x.clone()),
            (_, Universal) => Ok(Empty),
            (Universal, _) => Err(AttributeSetError::UndefinedComplement("UniversalSet")),
            (Finite(a), b) => Ok(AttributeSet::finite(
                a.iter().filter(|atom| !b.contains(atom)).cloned(),
            )),
            (Integers(a), Integers(b)) => Ok(AttributeSet::integers(a.difference(b))),
            (Integers(a), Finite(atoms)) => {
                let ints = atoms.iter().filter_map(Atom::as_int);
                Ok(AttributeSet::integers(
                    a.difference(&IntegerSet::from_ints(ints)),
                ))
            }
            (Regex(a), Regex(b)) => Ok(match a.difference(b)? {
                Some(set) => Regex(set),
                None => Empty,
            }),
            (Regex(a), Finite(atoms)) => {
                let literals: Vec<&str> =
                    atoms.iter().filter_map(|atom| atom.as_str()).collect();
                if literals.is_empty() {
                    return Ok(Regex(a.clone()));
                }
                let rhs = RegexSet::from_literals(literals)?;
                Ok(match a.difference(&rhs)? {
                    Some(set) => Regex(set),
                    None => Empty,
                })
            }
            // Disjoint atom kinds: nothing to remove.
            (Integers(a), Regex(_)) => Ok(Integers(a.clone())),
            (Regex(a), Integers(_)) => Ok(Regex(a.clone())),
        }
    }

    /// Complement, where defined: `Empty`/`Universal` swap, `Integers`
    /// complements over ℤ, `Regex` over all byte strings. `Finite` requires
    /// an explicit universe (see [`AttributeSet::complement_within`]).
    pub fn complement(&self) -> Result<AttributeSet, AttributeSetError> {
        use AttributeSet::*;
        match self {
            Empty => Ok(Universal),
            Universal => Ok(Empty),
            Integers(set) => Ok(AttributeSet::integers(set.complement())),
            Regex(set) => Ok(match set.complement()? {
                Some(comp) => Regex(comp),
                None => Empty,
            }),
            Finite(_) => Err(AttributeSetError::UndefinedComplement("FiniteSet")),
        }
    }

    /// Complement relative to an explicit universe: `universe ∖ self`.
    pub fn complement_within(
        &self,
        universe: &AttributeSet,
    ) -> Result<AttributeSet, AttributeSetError> {
        universe.difference(self)
    }
}

fn all_ints(
    atoms: &BTreeSet<Atom>,
    operation: &'static str,
    right: &'static str,
) -> Result<Vec<i64>, AttributeSetError> {
    atoms
        .iter()
        .map(|atom| {
            atom.as_int().ok_or(AttributeSetError::IncompatibleVariants {
                left: "FiniteSet",
                right,
                operation,
            })
        })
        .collect()
}

fn all_strings<'a>(
    atoms: &'a BTreeSet<Atom>,
    operation: &'static str,
    right: &'static str,
) -> Result<Vec<&'a str>, AttributeSetError> {
    atoms
        .iter()
        .map(|atom| {
            atom.as_str().ok_or(AttributeSetError::IncompatibleVariants {
                left: "FiniteSet",
                right,
                operation,
            })
        })
        .collect()
}

/// A map from attribute names to attribute sets.
pub type Attributes = BTreeMap<String, AttributeSet>;

/// Builds an attribute map from `(name, value)` pairs.
pub fn attrs(pairs: impl IntoIterator<Item = (&'static str, AttributeSet)>) -> Attributes {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Key-wise union of `incoming` into `target`.
pub fn add_attrs(target: &mut Attributes, incoming: &Attributes) -> Result<(), AttributeSetError> {
    for (key, value) in incoming {
        match target.get(key) {
            Some(existing) => {
                let merged = existing.union(value)?;
                target.insert(key.clone(), merged);
            }
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

/// Key-wise difference; a key whose value becomes empty is erased.
pub fn remove_attrs(
    target: &mut Attributes,
    removed: &Attributes,
) -> Result<(), AttributeSetError> {
    for (key, value) in removed {
        if let Some(existing) = target.get(key) {
            let remaining = existing.difference(value)?;
            if remaining.is_empty() {
                target.remove(key);
            } else {
                target.insert(key.clone(), remaining);
            }
        }
    }
    Ok(())
}

/// Key-wise union producing a fresh map.
pub fn union_attrs(a: &Attributes, b: &Attributes) -> Result<Attributes, AttributeSetError> {
    let mut out = a.clone();
    add_attrs(&mut out, b)?;
    Ok(out)
}

/// Key-wise difference `a ∖ b` producing a fresh map; empty values dropped.
pub fn sub_attrs(a: &Attributes, b: &Attributes) -> Result<Attributes, AttributeSetError> {
    let mut out = Attributes::new();
    for (key, value) in a {
        let remaining = match b.get(key) {
            Some(other) => value.difference(other)?,
            None => value.clone(),
        };
        if !remaining.is_empty() {
            out.insert(key.clone(), remaining);
        }
    }
    Ok(out)
}

/// Key-wise intersection over the common keys; empty values dropped.
pub fn intersect_attrs(a: &Attributes, b: &Attributes) -> Result<Attributes, AttributeSetError> {
    let mut out = Attributes::new();
    for (key, value) in a {
        if let Some(other) = b.get(key) {
            let meet = value.intersection(other)?;
            if !meet.is_empty() {
                out.insert(key.clone(), meet);
            }
        }
    }
    Ok(out)
}

/// Key-wise subsumption: every value of `sub` is included in the
/// corresponding value of `sup`. A key missing from `sup` counts as empty,
/// so only an empty value of `sub` can live under it.
pub fn attrs_included(sub: &Attributes, sup: &Attributes) -> bool {
    sub.iter().all(|(key, value)| match sup.get(key) {
        Some(other) => value.is_subset(other),
        None => value.is_empty(),
    })
}

/// Attribute-map equality under lattice equality of the values.
pub fn attrs_equal(a: &Attributes, b: &Attributes) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, value)| match b.get(key) {
            Some(other) => value.equals(other),
            None => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_collapses_to_empty() {
        assert_eq!(AttributeSet::finite([]), AttributeSet::Empty);
        assert!(AttributeSet::strings([]).is_empty());
    }

    #[test]
    fn absorption_laws() {
        let blue = AttributeSet::strings(["blue"]);
        assert_eq!(blue.union(&AttributeSet::Empty).unwrap(), blue);
        assert_eq!(
            blue.union(&AttributeSet::Universal).unwrap(),
            AttributeSet::Universal
        );
        assert_eq!(
            blue.intersection(&AttributeSet::Empty).unwrap(),
            AttributeSet::Empty
        );
        assert_eq!(blue.intersection(&AttributeSet::Universal).unwrap(), blue);
    }

    #[test]
    fn finite_union_and_difference() {
        let a = AttributeSet::strings(["alice", "john"]);
        let b = AttributeSet::strings(["john", "mary"]);
        let union = a.union(&b).unwrap();
        assert!(union.contains(&Atom::from("alice")));
        assert!(union.contains(&Atom::from("mary")));
        let diff = a.difference(&b).unwrap();
        assert_eq!(diff, AttributeSet::strings(["alice"]));
        let gone = a.difference(&a).unwrap();
        assert_eq!(gone, AttributeSet::Empty);
    }

    #[test]
    fn finite_lifts_into_integers() {
        let atoms = AttributeSet::ints([1, 5]);
        let range = AttributeSet::integers(IntegerSet::from_intervals([(
            Endpoint::Finite(2),
            Endpoint::Finite(4),
        )]));
        let union = atoms.union(&range).unwrap();
        assert_eq!(union.variant_name(), "IntegerSet");
        assert!(union.contains(&Atom::Int(1)));
        assert!(union.contains(&Atom::Int(3)));
        assert!(union.contains(&Atom::Int(5)));
        assert!(!union.contains(&Atom::Int(6)));
    }

    #[test]
    fn mixed_atoms_refuse_integer_lift() {
        let atoms = AttributeSet::finite([Atom::Int(1), Atom::from("x")]);
        let range = AttributeSet::integers(IntegerSet::all());
        let err = atoms.union(&range).unwrap_err();
        assert!(matches!(err, AttributeSetError::IncompatibleVariants { .. }));
    }

    #[test]
    fn strings_lift_into_regex() {
        let names = AttributeSet::strings(["alice"]);
        let pattern = AttributeSet::regex("bob|carol").unwrap();
        let union = names.union(&pattern).unwrap();
        assert_eq!(union.variant_name(), "RegexSet");
        assert!(union.contains(&Atom::from("alice")));
        assert!(union.contains(&Atom::from("bob")));
        assert!(!union.contains(&Atom::from("dave")));
    }

    #[test]
    fn regex_filters_finite_on_intersection() {
        let pattern = AttributeSet::regex("[a-m]+").unwrap();
        let atoms = AttributeSet::finite([Atom::from("abc"), Atom::from("xyz"), Atom::Int(3)]);
        let meet = pattern.intersection(&atoms).unwrap();
        assert_eq!(meet, AttributeSet::strings(["abc"]));
    }

    #[test]
    fn subset_is_sound_across_variants() {
        let small = AttributeSet::strings(["ab"]);
        let pattern = AttributeSet::regex("a[a-z]").unwrap();
        assert!(small.is_subset(&pattern));
        assert!(!pattern.is_subset(&small));

        let ints = AttributeSet::ints([3, 4]);
        let range = AttributeSet::integers(IntegerSet::from_intervals([(
            Endpoint::Finite(0),
            Endpoint::Finite(10),
        )]));
        assert!(ints.is_subset(&range));
        assert!(!range.is_subset(&ints));
    }

    #[test]
    fn bounded_integers_subset_of_finite() {
        let range = AttributeSet::integers(IntegerSet::from_intervals([(
            Endpoint::Finite(1),
            Endpoint::Finite(3),
        )]));
        let atoms = AttributeSet::ints([1, 2, 3, 9]);
        assert!(range.is_subset(&atoms));
        let unbounded = AttributeSet::integers(IntegerSet::all());
        assert!(!unbounded.is_subset(&atoms));
    }

    #[test]
    fn lattice_equality_vs_structural() {
        let a = AttributeSet::regex("a|b").unwrap();
        let b = AttributeSet::regex("b|a").unwrap();
        assert_ne!(a, b);
        assert!(a.equals(&b));
    }

    #[test]
    fn complement_rules() {
        assert_eq!(
            AttributeSet::Empty.complement().unwrap(),
            AttributeSet::Universal
        );
        let finite = AttributeSet::strings(["x"]);
        assert!(finite.complement().is_err());
        let universe = AttributeSet::strings(["x", "y"]);
        assert_eq!(
            finite.complement_within(&universe).unwrap(),
            AttributeSet::strings(["y"])
        );
    }

    #[test]
    fn attrs_helpers_roundtrip() {
        let mut target = attrs([("color", AttributeSet::strings(["blue"]))]);
        let incoming = attrs([
            ("color", AttributeSet::strings(["red"])),
            ("name", AttributeSet::strings(["alice"])),
        ]);
        add_attrs(&mut target, &incoming).unwrap();
        assert!(target["color"].contains(&Atom::from("red")));
        assert!(target["color"].contains(&Atom::from("blue")));
        assert!(target.contains_key("name"));

        remove_attrs(&mut target, &attrs([("name", AttributeSet::strings(["alice"]))])).unwrap();
        assert!(!target.contains_key("name"));
    }

    #[test]
    fn add_attrs_is_idempotent_per_key() {
        let mut target = attrs([("color", AttributeSet::strings(["blue"]))]);
        let snapshot = target.clone();
        add_attrs(&mut target, &snapshot.clone()).unwrap();
        assert!(attrs_equal(&target, &snapshot));
    }

    #[test]
    fn inclusion_treats_missing_as_empty() {
        let sub = attrs([("k", AttributeSet::Empty)]);
        let sup = Attributes::new();
        assert!(attrs_included(&sub, &sup));
        let sub2 = attrs([("k", AttributeSet::strings(["v"]))]);
        assert!(!attrs_included(&sub2, &sup));
    }
}
