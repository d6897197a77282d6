//! Capacity catalog: the ordered table of instance types a region can
//! provision, with their process-count thresholds and hourly prices.
//!
//! The catalog is immutable after construction and injected wherever
//! placement or scaling decisions need it. Successor links (the next
//! larger instance type) are derived from catalog order, so vertical
//! scale-out never has to guess.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{InstanceType, LoadBucket};

/// Errors raised by catalog construction and lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown instance type: {0}")]
    UnknownInstanceType(String),

    #[error("capacity catalog has no instance types")]
    EmptyCatalog,

    #[error("invalid capacity profile for {0}: {1}")]
    InvalidProfile(String, String),

    #[error("catalog not ordered smallest to largest at {0}")]
    UnorderedCatalog(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Capacity and pricing profile of one instance type.
///
/// Thresholds are strictly increasing: `0 < min < max < absolute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceProfile {
    pub instance_type: InstanceType,
    /// Active counts at or below this are `Underloaded`.
    pub min_threshold: u32,
    /// Active counts at or below this (and above min) are `Nominal`.
    pub max_threshold: u32,
    /// Hard capacity; a server at this count is `Saturated`.
    pub absolute_limit: u32,
    /// Price per simulated hour, in USD, for the owning region.
    pub hourly_price: f64,
    /// The next larger instance type, absent for the largest.
    pub successor: Option<InstanceType>,
}

impl InstanceProfile {
    pub fn new(
        instance_type: &str,
        min_threshold: u32,
        max_threshold: u32,
        absolute_limit: u32,
        hourly_price: f64,
    ) -> Self {
        Self {
            instance_type: instance_type.to_string(),
            min_threshold,
            max_threshold,
            absolute_limit,
            hourly_price,
            successor: None,
        }
    }

    /// Map an active process count to its load bucket.
    ///
    /// Zero is always `ScalingDown` regardless of thresholds. Counts above
    /// the absolute limit should never occur (placement guarantees it) and
    /// classify as `Saturated`.
    pub fn classify(&self, active: u32) -> LoadBucket {
        if active == 0 {
            LoadBucket::ScalingDown
        } else if active <= self.min_threshold {
            LoadBucket::Underloaded
        } else if active <= self.max_threshold {
            LoadBucket::Nominal
        } else if active < self.absolute_limit {
            LoadBucket::Overloaded
        } else {
            LoadBucket::Saturated
        }
    }

    fn validate(&self) -> CatalogResult<()> {
        if self.min_threshold == 0 {
            return Err(CatalogError::InvalidProfile(
                self.instance_type.clone(),
                "min threshold must be positive".to_string(),
            ));
        }
        if self.min_threshold >= self.max_threshold || self.max_threshold >= self.absolute_limit {
            return Err(CatalogError::InvalidProfile(
                self.instance_type.clone(),
                "thresholds must be strictly increasing".to_string(),
            ));
        }
        if self.hourly_price <= 0.0 {
            return Err(CatalogError::InvalidProfile(
                self.instance_type.clone(),
                "hourly price must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The fixed, ordered sequence of instance types for one region.
#[derive(Debug, Clone)]
pub struct CapacityCatalog {
    /// Profiles ordered smallest to largest.
    profiles: Vec<InstanceProfile>,
    /// instance_type → index into `profiles`.
    index: HashMap<InstanceType, usize>,
}

impl CapacityCatalog {
    /// Build a catalog from profiles ordered smallest to largest.
    ///
    /// Validates every profile, checks the ordering, and wires each
    /// profile's `successor` to the next entry in the sequence.
    pub fn new(mut profiles: Vec<InstanceProfile>) -> CatalogResult<Self> {
        if profiles.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        for profile in &profiles {
            profile.validate()?;
        }
        for pair in profiles.windows(2) {
            if pair[0].absolute_limit >= pair[1].absolute_limit {
                return Err(CatalogError::UnorderedCatalog(
                    pair[1].instance_type.clone(),
                ));
            }
        }

        let successors: Vec<Option<InstanceType>> = profiles
            .iter()
            .skip(1)
            .map(|p| Some(p.instance_type.clone()))
            .chain(std::iter::once(None))
            .collect();
        for (profile, successor) in profiles.iter_mut().zip(successors) {
            profile.successor = successor;
        }

        let index = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.instance_type.clone(), i))
            .collect();

        Ok(Self { profiles, index })
    }

    /// Look up a profile by instance type.
    pub fn get(&self, instance_type: &str) -> CatalogResult<&InstanceProfile> {
        self.index
            .get(instance_type)
            .map(|&i| &self.profiles[i])
            .ok_or_else(|| CatalogError::UnknownInstanceType(instance_type.to_string()))
    }

    /// The smallest instance type; new servers start here.
    pub fn smallest(&self) -> &InstanceProfile {
        &self.profiles[0]
    }

    /// The largest instance type; its absolute limit is the vertical ceiling.
    pub fn largest(&self) -> &InstanceProfile {
        &self.profiles[self.profiles.len() - 1]
    }

    /// The next larger profile after `instance_type`, or `None` at the top.
    pub fn successor(&self, instance_type: &str) -> CatalogResult<Option<&InstanceProfile>> {
        let profile = self.get(instance_type)?;
        match &profile.successor {
            Some(next) => Ok(Some(self.get(next)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceProfile> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_catalog() -> CapacityCatalog {
        CapacityCatalog::new(vec![
            InstanceProfile::new("c8", 2, 3, 5, 0.2859),
            InstanceProfile::new("c16", 3, 7, 10, 0.5719),
        ])
        .unwrap()
    }

    #[test]
    fn classification_table() {
        // The c8 profile: {min 2, max 3, absolute 5}.
        let catalog = small_catalog();
        let profile = catalog.get("c8").unwrap();

        assert_eq!(profile.classify(0), LoadBucket::ScalingDown);
        assert_eq!(profile.classify(1), LoadBucket::Underloaded);
        assert_eq!(profile.classify(2), LoadBucket::Underloaded);
        assert_eq!(profile.classify(3), LoadBucket::Nominal);
        assert_eq!(profile.classify(4), LoadBucket::Overloaded);
        assert_eq!(profile.classify(5), LoadBucket::Saturated);
    }

    #[test]
    fn out_of_range_count_is_saturated() {
        let catalog = small_catalog();
        assert_eq!(
            catalog.get("c8").unwrap().classify(6),
            LoadBucket::Saturated
        );
    }

    #[test]
    fn successors_follow_catalog_order() {
        let catalog = small_catalog();
        assert_eq!(
            catalog.successor("c8").unwrap().unwrap().instance_type,
            "c16"
        );
        assert!(catalog.successor("c16").unwrap().is_none());
    }

    #[test]
    fn smallest_and_largest() {
        let catalog = small_catalog();
        assert_eq!(catalog.smallest().instance_type, "c8");
        assert_eq!(catalog.largest().instance_type, "c16");
        assert_eq!(catalog.largest().absolute_limit, 10);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let catalog = small_catalog();
        assert!(matches!(
            catalog.get("c999"),
            Err(CatalogError::UnknownInstanceType(_))
        ));
    }

    #[test]
    fn empty_catalog_rejected() {
        assert!(matches!(
            CapacityCatalog::new(vec![]),
            Err(CatalogError::EmptyCatalog)
        ));
    }

    #[test]
    fn non_increasing_thresholds_rejected() {
        let result = CapacityCatalog::new(vec![InstanceProfile::new("bad", 3, 3, 5, 0.1)]);
        assert!(matches!(result, Err(CatalogError::InvalidProfile(_, _))));
    }

    #[test]
    fn zero_min_threshold_rejected() {
        let result = CapacityCatalog::new(vec![InstanceProfile::new("bad", 0, 3, 5, 0.1)]);
        assert!(matches!(result, Err(CatalogError::InvalidProfile(_, _))));
    }

    #[test]
    fn unordered_catalog_rejected() {
        let result = CapacityCatalog::new(vec![
            InstanceProfile::new("big", 3, 7, 10, 0.5),
            InstanceProfile::new("small", 2, 3, 5, 0.2),
        ]);
        assert!(matches!(result, Err(CatalogError::UnorderedCatalog(_))));
    }
}
