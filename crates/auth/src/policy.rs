//! On-demand policy materialization for enforcement points.
//!
//! A protected operation declares a permission string such as `"RH.FOLHA.E"`.
//! The string is turned into a [`PermissionRequirement`] when the check runs;
//! there is no registry of known permission strings to keep in sync.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorize::authorize;
use crate::permissions::{PermissionSet, SEGMENT_SEPARATOR};

/// A single required operation: `<system>.<function>` prefix plus one action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRequirement {
    prefix: String,
    action: String,
}

/// A declared permission string could not be split into prefix and action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed permission requirement '{0}'")]
pub struct MalformedRequirement(pub String);

impl PermissionRequirement {
    pub fn new(
        system_code: &str,
        function_code: &str,
        action: &str,
    ) -> Result<Self, MalformedRequirement> {
        format!(
            "{}{sep}{}{sep}{}",
            system_code.trim(),
            function_code.trim(),
            action.trim(),
            sep = SEGMENT_SEPARATOR
        )
        .parse()
    }

    /// `"<system>.<function>"`, compared case-insensitively against claim prefixes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Required action, upper-cased.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn system_code(&self) -> &str {
        self.prefix
            .split_once(SEGMENT_SEPARATOR)
            .map_or(self.prefix.as_str(), |(system, _)| system)
    }

    pub fn function_code(&self) -> Option<&str> {
        self.prefix
            .split_once(SEGMENT_SEPARATOR)
            .map(|(_, function)| function)
    }
}

impl FromStr for PermissionRequirement {
    type Err = MalformedRequirement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (prefix, action) = trimmed
            .rsplit_once(SEGMENT_SEPARATOR)
            .ok_or_else(|| MalformedRequirement(s.to_string()))?;
        if prefix.is_empty() || action.is_empty() || prefix.ends_with(SEGMENT_SEPARATOR) {
            return Err(MalformedRequirement(s.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            action: action.to_ascii_uppercase(),
        })
    }
}

impl core::fmt::Display for PermissionRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}{}", self.prefix, SEGMENT_SEPARATOR, self.action)
    }
}

/// Something that can be checked against the permissions of a credential.
pub trait Requirement {
    fn is_satisfied_by(&self, permissions: &PermissionSet) -> bool;
}

impl Requirement for PermissionRequirement {
    fn is_satisfied_by(&self, permissions: &PermissionSet) -> bool {
        authorize(self, permissions)
    }
}

/// Build a requirement from a permission string found at an enforcement point.
pub fn materialize(declared: &str) -> Result<PermissionRequirement, MalformedRequirement> {
    declared.parse()
}

/// Outcome of an enforcement check. Carries no detail about what was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Materialize `declared` and evaluate it against `permissions`.
///
/// A malformed declaration is a developer error: it denies and logs at
/// `error` level, it never panics.
pub fn enforce(declared: &str, permissions: &PermissionSet) -> Decision {
    let requirement = match materialize(declared) {
        Ok(requirement) => requirement,
        Err(err) => {
            tracing::error!(permission = %declared, error = %err, "protected operation declares a malformed permission");
            return Decision::Deny;
        }
    };

    if requirement.is_satisfied_by(permissions) {
        Decision::Allow
    } else {
        tracing::debug!(permission = %requirement, claims = permissions.len(), "permission denied");
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialize_splits_prefix_and_action() {
        let req = materialize("SEG.SEG_USUARIOS.c").unwrap();
        assert_eq!(req.prefix(), "SEG.SEG_USUARIOS");
        assert_eq!(req.action(), "C");
        assert_eq!(req.system_code(), "SEG");
        assert_eq!(req.function_code(), Some("SEG_USUARIOS"));
        assert_eq!(req.to_string(), "SEG.SEG_USUARIOS.C");
    }

    #[test]
    fn two_segment_requirement_has_system_only_prefix() {
        let req = materialize("RH.C").unwrap();
        assert_eq!(req.prefix(), "RH");
        assert_eq!(req.function_code(), None);
    }

    #[test]
    fn unsplittable_requirements_are_malformed() {
        for bad in ["", "RHFOLHA", "RH.FOLHA.", ".C", "RH..C", "   "] {
            assert!(materialize(bad).is_err(), "expected '{bad}' to be malformed");
        }
    }

    #[test]
    fn new_trims_fixed_width_codes() {
        let req = PermissionRequirement::new("RH  ", "FOLHA     ", "e").unwrap();
        assert_eq!(req.to_string(), "RH.FOLHA.E");
    }

    #[test]
    fn enforce_allows_matching_claim() {
        let perms = PermissionSet::from_claims(["RH.FOLHA.IAEC"]);
        assert_eq!(enforce("RH.FOLHA.E", &perms), Decision::Allow);
    }

    #[test]
    fn enforce_denies_malformed_declaration() {
        let perms = PermissionSet::from_claims(["RH.FOLHA.IAEC"]);
        assert_eq!(enforce("RHFOLHA", &perms), Decision::Deny);
    }

    #[test]
    fn enforce_denies_without_claims() {
        assert_eq!(enforce("RH.FOLHA.C", &PermissionSet::empty()), Decision::Deny);
    }

    #[test]
    fn requirement_trait_is_object_safe() {
        let req: Box<dyn Requirement> = Box::new(materialize("RH.FOLHA.C").unwrap());
        assert!(req.is_satisfied_by(&PermissionSet::from_claims(["rh.folha.c"])));
    }
}
