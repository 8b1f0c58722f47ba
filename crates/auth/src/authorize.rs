use crate::permissions::PermissionSet;
use crate::policy::PermissionRequirement;

/// Decide whether `permissions` grant `requirement`.
///
/// - No IO
/// - No panics
/// - Linear scan, first matching claim wins; duplicate or contradictory claims
///   are tolerated (any match allows)
pub fn authorize(requirement: &PermissionRequirement, permissions: &PermissionSet) -> bool {
    if permissions.is_empty() {
        return false;
    }
    permissions.iter().any(|claim| claim.satisfies(requirement))
}

/// [`authorize`] over raw wire claims.
pub fn authorize_claims<S: AsRef<str>>(requirement: &PermissionRequirement, claims: &[S]) -> bool {
    if claims.is_empty() {
        return false;
    }
    authorize(requirement, &PermissionSet::from_claims(claims))
}
