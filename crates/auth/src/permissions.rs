//! Permission grants and the flattened claim wire format.
//!
//! A grant is `(system, function, action codes, restriction)`. On the wire it
//! is flattened to `"<system>.<function>.<action_codes>"`, e.g. `"RH.FOLHA.IAEC"`.
//! Codes are assumed dot-free by schema, so no escaping is applied.

use serde::{Deserialize, Serialize};

use crate::policy::PermissionRequirement;

/// Separator between claim segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// Restriction character meaning "no access to this function".
pub const NO_ACCESS: char = 'N';

/// Canonical emission order for the well-known actions (Insert, Alter, Erase, Consult).
const CANONICAL_ACTIONS: [char; 4] = ['I', 'A', 'E', 'C'];

/// Set of allowed action characters for one function.
///
/// Stored upper-cased, deduplicated and in canonical order (`I`, `A`, `E`, `C`,
/// then any other characters ascending) so flattened claims are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCodes(String);

impl ActionCodes {
    pub fn new(raw: &str) -> Self {
        let mut chars: Vec<char> = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != SEGMENT_SEPARATOR)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        chars.sort_by_key(|c| (canonical_rank(*c), *c));
        chars.dedup();
        Self(chars.into_iter().collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of both sets, in canonical order.
    pub fn union(&self, other: &ActionCodes) -> ActionCodes {
        let mut joined = String::with_capacity(self.0.len() + other.0.len());
        joined.push_str(&self.0);
        joined.push_str(&other.0);
        ActionCodes::new(&joined)
    }

    pub fn contains(&self, action: char) -> bool {
        let action = action.to_ascii_uppercase();
        self.0.chars().any(|c| c == action)
    }
}

impl core::fmt::Display for ActionCodes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_rank(c: char) -> usize {
    CANONICAL_ACTIONS
        .iter()
        .position(|known| *known == c)
        .unwrap_or(CANONICAL_ACTIONS.len())
}

/// Single-character restriction qualifying a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionCode {
    /// Blank column: no further restriction.
    #[default]
    Unrestricted,
    /// The `N` sentinel.
    NoAccess,
    /// Any other (row/field level) restriction marker.
    Other(char),
}

impl RestrictionCode {
    /// Parse a legacy restriction column (blank, `N`, or another single character).
    pub fn from_code(raw: Option<&str>) -> Self {
        let Some(c) = raw.and_then(|s| s.trim().chars().next()) else {
            return RestrictionCode::Unrestricted;
        };
        match c.to_ascii_uppercase() {
            NO_ACCESS => RestrictionCode::NoAccess,
            other => RestrictionCode::Other(other),
        }
    }

    pub fn is_no_access(&self) -> bool {
        matches!(self, RestrictionCode::NoAccess)
    }

    /// Combine the restrictions of two groups granting the same function.
    ///
    /// `NoAccess` dominates; any marker beats `Unrestricted`; between two
    /// distinct markers the lower character wins so the result is
    /// independent of group order.
    pub fn merge(self, other: RestrictionCode) -> RestrictionCode {
        use RestrictionCode::*;
        match (self, other) {
            (NoAccess, _) | (_, NoAccess) => NoAccess,
            (Unrestricted, x) | (x, Unrestricted) => x,
            (Other(a), Other(b)) => Other(a.min(b)),
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            RestrictionCode::Unrestricted => None,
            RestrictionCode::NoAccess => Some(NO_ACCESS),
            RestrictionCode::Other(c) => Some(*c),
        }
    }
}

/// Effective permission of a user on one (system, function) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub system_code: String,
    pub function_code: String,
    pub action_codes: ActionCodes,
    pub restriction: RestrictionCode,
}

impl PermissionGrant {
    pub fn new(
        system_code: impl AsRef<str>,
        function_code: impl AsRef<str>,
        action_codes: &str,
        restriction: RestrictionCode,
    ) -> Self {
        Self {
            system_code: system_code.as_ref().trim().to_string(),
            function_code: function_code.as_ref().trim().to_string(),
            action_codes: ActionCodes::new(action_codes),
            restriction,
        }
    }

    /// Flattened wire form, or `None` when the grant confers nothing
    /// (no-access sentinel or empty action set).
    pub fn to_claim(&self) -> Option<String> {
        if self.restriction.is_no_access() || self.action_codes.is_empty() {
            return None;
        }
        Some(format!(
            "{}{sep}{}{sep}{}",
            self.system_code,
            self.function_code,
            self.action_codes,
            sep = SEGMENT_SEPARATOR
        ))
    }
}

/// Flatten grants into claim strings, dropping grants that confer no access.
pub fn flatten_grants(grants: &[PermissionGrant]) -> Vec<String> {
    grants.iter().filter_map(PermissionGrant::to_claim).collect()
}

/// A permission claim parsed from its wire form.
///
/// The prefix is every segment but the last; the last segment is the string of
/// action characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionClaim {
    prefix: String,
    action_codes: String,
}

impl PermissionClaim {
    pub fn parse(raw: &str) -> Option<Self> {
        let (prefix, codes) = raw.trim().rsplit_once(SEGMENT_SEPARATOR)?;
        if prefix.is_empty() || codes.is_empty() {
            return None;
        }
        Some(Self {
            prefix: prefix.to_string(),
            action_codes: codes.to_ascii_uppercase(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn action_codes(&self) -> &str {
        &self.action_codes
    }

    /// Prefix equality (case-insensitive) plus case-insensitive containment of
    /// the required action within this claim's action codes.
    pub fn satisfies(&self, requirement: &PermissionRequirement) -> bool {
        self.prefix.eq_ignore_ascii_case(requirement.prefix())
            && self.action_codes.contains(requirement.action())
    }

    pub fn to_wire(&self) -> String {
        format!("{}{}{}", self.prefix, SEGMENT_SEPARATOR, self.action_codes)
    }
}

/// Permission claims of one credential, parsed once at the decode boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    claims: Vec<PermissionClaim>,
}

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse wire claims. Claims that cannot be split are skipped.
    pub fn from_claims<I, S>(claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for raw in claims {
            let raw = raw.as_ref();
            match PermissionClaim::parse(raw) {
                Some(claim) => parsed.push(claim),
                None => tracing::debug!(claim = %raw, "skipping unparseable permission claim"),
            }
        }
        Self { claims: parsed }
    }

    pub fn from_grants(grants: &[PermissionGrant]) -> Self {
        Self::from_claims(flatten_grants(grants))
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionClaim> {
        self.claims.iter()
    }

    pub fn to_wire(&self) -> Vec<String> {
        self.claims.iter().map(PermissionClaim::to_wire).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_are_canonicalized() {
        assert_eq!(ActionCodes::new("ceai").as_str(), "IAEC");
        assert_eq!(ActionCodes::new("CXCI").as_str(), "ICX");
        assert_eq!(ActionCodes::new(" c ").as_str(), "C");
    }

    #[test]
    fn action_codes_union_deduplicates() {
        let merged = ActionCodes::new("IC").union(&ActionCodes::new("CE"));
        assert_eq!(merged.as_str(), "IEC");
        assert!(merged.contains('e'));
        assert!(!merged.contains('A'));
    }

    #[test]
    fn restriction_parsing() {
        assert_eq!(RestrictionCode::from_code(None), RestrictionCode::Unrestricted);
        assert_eq!(RestrictionCode::from_code(Some("  ")), RestrictionCode::Unrestricted);
        assert_eq!(RestrictionCode::from_code(Some("n")), RestrictionCode::NoAccess);
        assert_eq!(RestrictionCode::from_code(Some("R")), RestrictionCode::Other('R'));
    }

    #[test]
    fn no_access_dominates_restriction_merge() {
        let merged = RestrictionCode::Other('R').merge(RestrictionCode::NoAccess);
        assert!(merged.is_no_access());
        assert!(RestrictionCode::Unrestricted.merge(RestrictionCode::NoAccess).is_no_access());
        assert_eq!(
            RestrictionCode::Unrestricted.merge(RestrictionCode::Other('R')),
            RestrictionCode::Other('R')
        );
        assert_eq!(
            RestrictionCode::Other('S').merge(RestrictionCode::Other('R')),
            RestrictionCode::Other('R')
        );
    }

    #[test]
    fn grant_flattens_to_wire_format() {
        let grant = PermissionGrant::new("RH ", "FOLHA   ", "CEAI", RestrictionCode::Unrestricted);
        assert_eq!(grant.to_claim().as_deref(), Some("RH.FOLHA.IAEC"));
    }

    #[test]
    fn no_access_and_empty_grants_produce_no_claim() {
        let denied = PermissionGrant::new("RH", "FOLHA", "IAEC", RestrictionCode::NoAccess);
        let empty = PermissionGrant::new("RH", "FERIAS", "", RestrictionCode::Unrestricted);
        let kept = PermissionGrant::new("RH", "PONTO", "C", RestrictionCode::Other('R'));
        assert_eq!(flatten_grants(&[denied, empty, kept]), vec!["RH.PONTO.C".to_string()]);
    }

    #[test]
    fn claim_parse_splits_on_last_segment() {
        let claim = PermissionClaim::parse("SEG.SEG_USUARIOS.iaec").unwrap();
        assert_eq!(claim.prefix(), "SEG.SEG_USUARIOS");
        assert_eq!(claim.action_codes(), "IAEC");
    }

    #[test]
    fn claim_parse_rejects_unsplittable_input() {
        assert!(PermissionClaim::parse("RHFOLHA").is_none());
        assert!(PermissionClaim::parse("RH.FOLHA.").is_none());
        assert!(PermissionClaim::parse(".IAEC").is_none());
    }

    #[test]
    fn permission_set_skips_garbage() {
        let set = PermissionSet::from_claims(["RH.FOLHA.IAEC", "garbage", ""]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.to_wire(), vec!["RH.FOLHA.IAEC".to_string()]);
    }
}
