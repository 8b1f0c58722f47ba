//! Effective-permission aggregation over the legacy group/function schema.
//!
//! A user belongs to groups (per system); groups are granted action codes on
//! functions. The aggregator folds the rows of every effective membership into
//! one [`PermissionGrant`] per (system, function).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::StoreError;
use crate::identity::UserKey;
use crate::permissions::{ActionCodes, PermissionGrant, RestrictionCode};

/// Membership of a user in a group of one system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMembership {
    pub system_code: String,
    pub group_code: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    /// Whether the owning system is marked active.
    pub system_active: bool,
}

impl GroupMembership {
    /// Active, owned by an active system, and not expired at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.active && self.system_active && self.expires_at.is_none_or(|exp| exp > now)
    }

    fn key(&self) -> (String, String) {
        (
            self.system_code.trim().to_ascii_uppercase(),
            self.group_code.trim().to_ascii_uppercase(),
        )
    }
}

/// One group→function grant row joined with its system's active flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupGrantRow {
    pub system_code: String,
    pub group_code: String,
    pub function_code: String,
    pub action_codes: String,
    pub restriction_code: Option<String>,
    pub system_active: bool,
}

/// Read-only source of memberships and grant rows.
///
/// Implementations must be safe under concurrent reads.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Memberships of `user` that are active, unexpired at `now` and owned by
    /// an active system.
    async fn memberships(&self, user: &UserKey, now: DateTime<Utc>) -> Result<Vec<GroupMembership>, StoreError>;

    /// Grant rows for the given (system, group) pairs.
    async fn group_grants(&self, memberships: &[GroupMembership]) -> Result<Vec<GroupGrantRow>, StoreError>;
}

#[async_trait]
impl<S: PermissionStore + ?Sized> PermissionStore for Arc<S> {
    async fn memberships(&self, user: &UserKey, now: DateTime<Utc>) -> Result<Vec<GroupMembership>, StoreError> {
        (**self).memberships(user, now).await
    }

    async fn group_grants(&self, memberships: &[GroupMembership]) -> Result<Vec<GroupGrantRow>, StoreError> {
        (**self).group_grants(memberships).await
    }
}

/// Result of [`PermissionAggregator::aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub groups: Vec<GroupMembership>,
    pub grants: Vec<PermissionGrant>,
}

/// Fold grant rows into one grant per (system, function).
///
/// Rows are kept only when their system is active and they belong to an
/// effective membership, even if the store already filtered them. Duplicate
/// (system, function) rows union their action codes and merge restrictions
/// with [`RestrictionCode::merge`]. Output is ordered by system, lowest
/// contributing group, then function.
pub fn merge_grants(memberships: &[GroupMembership], rows: &[GroupGrantRow], now: DateTime<Utc>) -> Vec<PermissionGrant> {
    let effective: BTreeSet<(String, String)> = memberships
        .iter()
        .filter(|m| m.is_effective(now))
        .map(GroupMembership::key)
        .collect();

    let mut merged: HashMap<(String, String), (String, PermissionGrant)> = HashMap::new();
    for row in rows {
        if !row.system_active {
            continue;
        }
        let system = row.system_code.trim().to_ascii_uppercase();
        let group = row.group_code.trim().to_ascii_uppercase();
        if !effective.contains(&(system.clone(), group.clone())) {
            continue;
        }
        let function = row.function_code.trim().to_ascii_uppercase();
        let restriction = RestrictionCode::from_code(row.restriction_code.as_deref());
        let actions = ActionCodes::new(&row.action_codes);

        merged
            .entry((system, function))
            .and_modify(|(min_group, grant)| {
                grant.action_codes = grant.action_codes.union(&actions);
                grant.restriction = grant.restriction.merge(restriction);
                if group < *min_group {
                    *min_group = group.clone();
                }
            })
            .or_insert_with(|| {
                (
                    group.clone(),
                    PermissionGrant {
                        system_code: row.system_code.trim().to_string(),
                        function_code: row.function_code.trim().to_string(),
                        action_codes: actions.clone(),
                        restriction,
                    },
                )
            });
    }

    let mut ordered: Vec<((String, String, String), PermissionGrant)> = merged
        .into_iter()
        .map(|((system, function), (group, grant))| ((system, group, function), grant))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));
    ordered.into_iter().map(|(_, grant)| grant).collect()
}

/// Loads the effective permissions of a user.
#[derive(Debug, Clone)]
pub struct PermissionAggregator<S> {
    store: S,
}

impl<S: PermissionStore> PermissionAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Aggregate the memberships and grants of `user` as of `now`.
    ///
    /// No memberships is an empty success. Store failures and cancellation are
    /// errors, never a partial list.
    #[instrument(skip_all, fields(user = %user))]
    pub async fn aggregate(
        &self,
        user: &UserKey,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, StoreError> {
        let load = async {
            let mut groups: Vec<GroupMembership> = self
                .store
                .memberships(user, now)
                .await?
                .into_iter()
                .filter(|m| m.is_effective(now))
                .collect();
            groups.sort_by_key(GroupMembership::key);
            groups.dedup_by(|a, b| a.key() == b.key());

            if groups.is_empty() {
                return Ok::<_, StoreError>(Aggregation::default());
            }

            let rows = self.store.group_grants(&groups).await?;
            let grants = merge_grants(&groups, &rows, now);
            Ok(Aggregation { groups, grants })
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = load => result,
        };

        match &result {
            Ok(aggregation) => info!(
                groups = aggregation.groups.len(),
                grants = aggregation.grants.len(),
                "permissions aggregated"
            ),
            Err(StoreError::Cancelled) => info!("permission aggregation cancelled"),
            Err(err) => error!(error = %err, "permission store unavailable"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn membership(system: &str, group: &str) -> GroupMembership {
        GroupMembership {
            system_code: system.into(),
            group_code: group.into(),
            expires_at: None,
            active: true,
            system_active: true,
        }
    }

    fn row(system: &str, group: &str, function: &str, actions: &str, restriction: Option<&str>) -> GroupGrantRow {
        GroupGrantRow {
            system_code: system.into(),
            group_code: group.into(),
            function_code: function.into(),
            action_codes: actions.into(),
            restriction_code: restriction.map(str::to_string),
            system_active: true,
        }
    }

    #[derive(Default)]
    struct FakeStore {
        memberships: Vec<GroupMembership>,
        rows: Vec<GroupGrantRow>,
        down: AtomicBool,
        hang: bool,
    }

    #[async_trait]
    impl PermissionStore for FakeStore {
        async fn memberships(&self, _user: &UserKey, now: DateTime<Utc>) -> Result<Vec<GroupMembership>, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(self.memberships.iter().filter(|m| m.is_effective(now)).cloned().collect())
        }

        async fn group_grants(&self, memberships: &[GroupMembership]) -> Result<Vec<GroupGrantRow>, StoreError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            Ok(self
                .rows
                .iter()
                .filter(|r| {
                    memberships
                        .iter()
                        .any(|m| m.system_code == r.system_code && m.group_code == r.group_code)
                })
                .cloned()
                .collect())
        }
    }

    fn user() -> UserKey {
        UserKey::new("admin").unwrap()
    }

    #[test]
    fn duplicate_functions_union_actions() {
        let groups = [membership("RH", "G1"), membership("RH", "G2")];
        let rows = [
            row("RH", "G1", "FOLHA", "IC", None),
            row("RH", "G2", "FOLHA", "AE", None),
        ];
        let grants = merge_grants(&groups, &rows, Utc::now());
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].action_codes.as_str(), "IAEC");
    }

    #[test]
    fn no_access_sentinel_dominates() {
        let groups = [membership("RH", "G1"), membership("RH", "G2")];
        let rows = [
            row("RH", "G1", "FOLHA", "IAEC", None),
            row("RH", "G2", "FOLHA", "C", Some("N")),
        ];
        let grants = merge_grants(&groups, &rows, Utc::now());
        assert_eq!(grants[0].restriction, RestrictionCode::NoAccess);
        assert_eq!(grants[0].to_claim(), None);
    }

    #[test]
    fn rows_of_inactive_systems_and_foreign_groups_are_dropped() {
        let groups = [membership("RH", "G1")];
        let mut inactive = row("RH", "G1", "PONTO", "C", None);
        inactive.system_active = false;
        let rows = [
            row("RH", "G1", "FOLHA", "C", None),
            inactive,
            row("RH", "OTHER", "FERIAS", "C", None),
        ];
        let grants = merge_grants(&groups, &rows, Utc::now());
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].function_code, "FOLHA");
    }

    #[test]
    fn memberships_are_rechecked_for_expiry_and_system() {
        let now = Utc::now();
        let mut expired = membership("RH", "G1");
        expired.expires_at = Some(now - Duration::seconds(1));
        let mut dead_system = membership("SEG", "G1");
        dead_system.system_active = false;
        let mut future = membership("FIN", "G1");
        future.expires_at = Some(now + Duration::days(1));

        assert!(!expired.is_effective(now));
        assert!(!dead_system.is_effective(now));
        assert!(future.is_effective(now));

        let rows = [
            row("RH", "G1", "FOLHA", "C", None),
            row("SEG", "G1", "USUARIOS", "C", None),
            row("FIN", "G1", "CAIXA", "C", None),
        ];
        let grants = merge_grants(&[expired, dead_system, future], &rows, now);
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].system_code, "FIN");
    }

    #[test]
    fn output_order_is_system_group_function() {
        let groups = [membership("SEG", "A"), membership("RH", "B"), membership("RH", "A")];
        let rows = [
            row("SEG", "A", "USUARIOS", "C", None),
            row("RH", "B", "AAA", "C", None),
            row("RH", "A", "ZZZ", "C", None),
            row("RH", "A", "MMM", "C", None),
        ];
        let order: Vec<String> = merge_grants(&groups, &rows, Utc::now())
            .into_iter()
            .map(|g| format!("{}.{}", g.system_code, g.function_code))
            .collect();
        assert_eq!(order, ["RH.MMM", "RH.ZZZ", "RH.AAA", "SEG.USUARIOS"]);
    }

    #[tokio::test]
    async fn no_memberships_is_empty_success() {
        let aggregator = PermissionAggregator::new(FakeStore::default());
        let result = aggregator
            .aggregate(&user(), Utc::now(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.groups.is_empty());
        assert!(result.grants.is_empty());
    }

    #[tokio::test]
    async fn store_outage_is_an_error_not_an_empty_list() {
        let store = FakeStore {
            memberships: vec![membership("RH", "G1")],
            ..Default::default()
        };
        store.down.store(true, Ordering::SeqCst);
        let aggregator = PermissionAggregator::new(store);
        let err = aggregator
            .aggregate(&user(), Utc::now(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn cancellation_is_a_distinct_failure() {
        let store = FakeStore {
            memberships: vec![membership("RH", "G1")],
            rows: vec![row("RH", "G1", "FOLHA", "C", None)],
            hang: true,
            ..Default::default()
        };
        let aggregator = PermissionAggregator::new(store);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = aggregator.aggregate(&user(), Utc::now(), &cancel).await.unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let store = Arc::new(FakeStore {
            memberships: vec![membership("SEG", "ADM"), membership("RH", "G2"), membership("RH", "G1")],
            rows: vec![
                row("RH", "G1", "FOLHA", "CI", None),
                row("RH", "G2", "FOLHA", "E", None),
                row("RH", "G2", "PONTO", "C", Some("R")),
                row("SEG", "ADM", "SEG_USUARIOS", "IAEC", None),
            ],
            ..Default::default()
        });
        let aggregator = PermissionAggregator::new(store);
        let now = Utc::now();
        let first = aggregator.aggregate(&user(), now, &CancellationToken::new()).await.unwrap();
        let second = aggregator.aggregate(&user(), now, &CancellationToken::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.grants[0].action_codes.as_str(), "IEC");
    }

    proptest! {
        #[test]
        fn merged_actions_are_the_union_and_sentinel_dominates(
            contributions in proptest::collection::vec(("[IAEC]{0,4}", proptest::option::of("[NRX]")), 1..6),
        ) {
            let groups: Vec<GroupMembership> = (0..contributions.len())
                .map(|i| membership("RH", &format!("G{i}")))
                .collect();
            let rows: Vec<GroupGrantRow> = contributions
                .iter()
                .enumerate()
                .map(|(i, (actions, restriction))| {
                    row("RH", &format!("G{i}"), "FOLHA", actions, restriction.as_deref())
                })
                .collect();

            let grants = merge_grants(&groups, &rows, Utc::now());
            prop_assert_eq!(grants.len(), 1);

            let expected: String = contributions.iter().map(|(a, _)| a.as_str()).collect();
            prop_assert_eq!(&grants[0].action_codes, &ActionCodes::new(&expected));

            let any_sentinel = contributions.iter().any(|(_, r)| r.as_deref() == Some("N"));
            prop_assert_eq!(grants[0].restriction.is_no_access(), any_sentinel);

            let mut reversed = rows.clone();
            reversed.reverse();
            prop_assert_eq!(merge_grants(&groups, &reversed, Utc::now()), grants);
        }
    }
}
