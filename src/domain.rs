//! Pure lease-lifecycle rules: status enumerations, the transition table,
//! effective-status derivation and occupancy planning. Nothing here touches
//! the database; the services feed in the facts (shared unit, pointer state)
//! and apply the resulting plan inside their transaction.

use chrono::NaiveDate;

/// Sentinel recorded as the "old" status on the creation activity.
pub const CREATION_SENTINEL: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseStatus {
    Pending,
    Active,
    Terminated,
}

impl LeaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Terminated => "Terminated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Pending" => Some(Self::Pending),
            "Active" => Some(Self::Active),
            "Terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// What callers see: stored status, except an Active lease past its end date
/// reads as Month-to-Month. Never stored, so it cannot go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveStatus {
    Pending,
    Active,
    MonthToMonth,
    Terminated,
}

impl EffectiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::MonthToMonth => "Month-to-Month",
            Self::Terminated => "Terminated",
        }
    }

    /// The transition table, keyed off the effective status.
    pub fn allowed_targets(self) -> &'static [LeaseStatus] {
        match self {
            Self::Pending => &[LeaseStatus::Active],
            Self::Active => &[LeaseStatus::Terminated],
            Self::MonthToMonth => &[LeaseStatus::Terminated],
            Self::Terminated => &[LeaseStatus::Active, LeaseStatus::Pending],
        }
    }

    pub fn allows(self, target: LeaseStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

pub fn effective_status(status: LeaseStatus, end_date: NaiveDate, today: NaiveDate) -> EffectiveStatus {
    match status {
        LeaseStatus::Active if end_date < today => EffectiveStatus::MonthToMonth,
        LeaseStatus::Active => EffectiveStatus::Active,
        LeaseStatus::Pending => EffectiveStatus::Pending,
        LeaseStatus::Terminated => EffectiveStatus::Terminated,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Available,
    Occupied,
    UnderMaintenance,
}

impl UnitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
            Self::UnderMaintenance => "UnderMaintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Partial,
    Late,
    Pending,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Paid" => Some(Self::Paid),
            "Partial" => Some(Self::Partial),
            "Late" => Some(Self::Late),
            "Pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// Occupancy writes a status change requires, beyond the lease row itself.
///
/// `release_unit` and `clear_tenant` are conditional at apply time: the unit
/// is only released when no other Active lease claims it, and the tenant
/// pointer is only cleared when it still points at this lease's unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccupancyPlan {
    pub occupy_unit: bool,
    pub assign_tenant: bool,
    pub release_unit: bool,
    pub clear_tenant: bool,
}

/// Plan the occupancy side effects of transitioning a lease to `target`.
///
/// `unit_shared` is whether another Active lease references the same unit
/// (queried inside the caller's transaction).
pub fn plan_status_change(target: LeaseStatus, unit_shared: bool) -> OccupancyPlan {
    match target {
        LeaseStatus::Active => OccupancyPlan {
            occupy_unit: true,
            assign_tenant: true,
            ..OccupancyPlan::default()
        },
        LeaseStatus::Terminated => OccupancyPlan {
            release_unit: !unit_shared,
            clear_tenant: true,
            ..OccupancyPlan::default()
        },
        // Pending is only a reset from Terminated; occupancy was already
        // settled when the lease left Active.
        LeaseStatus::Pending => OccupancyPlan::default(),
    }
}

/// Occupancy migration for a full lease update (status never changes here).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassignmentPlan {
    pub release_old_unit: bool,
    pub clear_old_tenant: bool,
    pub occupy_new_unit: bool,
    pub assign_new_tenant: bool,
}

pub fn plan_reassignment(
    is_active: bool,
    unit_changed: bool,
    tenant_changed: bool,
    old_unit_shared: bool,
) -> ReassignmentPlan {
    if !is_active {
        return ReassignmentPlan::default();
    }
    if unit_changed {
        return ReassignmentPlan {
            release_old_unit: !old_unit_shared,
            clear_old_tenant: true,
            occupy_new_unit: true,
            assign_new_tenant: true,
        };
    }
    if tenant_changed {
        // Unit untouched; only the tenant pointer migrates.
        return ReassignmentPlan {
            clear_old_tenant: true,
            assign_new_tenant: true,
            ..ReassignmentPlan::default()
        };
    }
    ReassignmentPlan::default()
}

/// `RCP-YYYYMMDD-NNN` with a zero-padded per-landlord daily sequence.
pub fn receipt_number(date: NaiveDate, seq: i64) -> String {
    format!("RCP-{}-{:03}", date.format("%Y%m%d"), seq)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        effective_status, plan_reassignment, plan_status_change, receipt_number, EffectiveStatus,
        LeaseStatus, OccupancyPlan, PaymentStatus, ReassignmentPlan, UnitStatus,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn transition_table_is_exactly_the_allowed_set() {
        let all_from = [
            EffectiveStatus::Pending,
            EffectiveStatus::Active,
            EffectiveStatus::MonthToMonth,
            EffectiveStatus::Terminated,
        ];
        let all_to = [
            LeaseStatus::Pending,
            LeaseStatus::Active,
            LeaseStatus::Terminated,
        ];

        for from in all_from {
            for to in all_to {
                let expected = matches!(
                    (from, to),
                    (EffectiveStatus::Pending, LeaseStatus::Active)
                        | (EffectiveStatus::Active, LeaseStatus::Terminated)
                        | (EffectiveStatus::MonthToMonth, LeaseStatus::Terminated)
                        | (EffectiveStatus::Terminated, LeaseStatus::Active)
                        | (EffectiveStatus::Terminated, LeaseStatus::Pending)
                );
                assert_eq!(
                    from.allows(to),
                    expected,
                    "transition {} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn active_past_end_date_reads_month_to_month() {
        let today = date(2026, 6, 15);
        assert_eq!(
            effective_status(LeaseStatus::Active, date(2026, 6, 14), today),
            EffectiveStatus::MonthToMonth
        );
        assert_eq!(
            effective_status(LeaseStatus::Active, date(2026, 6, 16), today),
            EffectiveStatus::Active
        );
        // End date today is not yet past.
        assert_eq!(
            effective_status(LeaseStatus::Active, today, today),
            EffectiveStatus::Active
        );
        // Derivation never touches non-Active leases.
        assert_eq!(
            effective_status(LeaseStatus::Pending, date(2020, 1, 1), today),
            EffectiveStatus::Pending
        );
        assert_eq!(
            effective_status(LeaseStatus::Terminated, date(2020, 1, 1), today),
            EffectiveStatus::Terminated
        );
    }

    #[test]
    fn activation_occupies_unit_and_assigns_tenant() {
        assert_eq!(
            plan_status_change(LeaseStatus::Active, false),
            OccupancyPlan {
                occupy_unit: true,
                assign_tenant: true,
                release_unit: false,
                clear_tenant: false,
            }
        );
    }

    #[test]
    fn termination_releases_unit_unless_shared() {
        let exclusive = plan_status_change(LeaseStatus::Terminated, false);
        assert!(exclusive.release_unit && exclusive.clear_tenant);
        assert!(!exclusive.occupy_unit && !exclusive.assign_tenant);

        let shared = plan_status_change(LeaseStatus::Terminated, true);
        assert!(!shared.release_unit);
        assert!(shared.clear_tenant);
    }

    #[test]
    fn pending_reset_has_no_occupancy_side_effects() {
        assert_eq!(
            plan_status_change(LeaseStatus::Pending, false),
            OccupancyPlan::default()
        );
    }

    #[test]
    fn update_migrates_occupancy_only_while_active() {
        assert_eq!(
            plan_reassignment(false, true, true, false),
            ReassignmentPlan::default()
        );

        let unit_move = plan_reassignment(true, true, false, false);
        assert_eq!(
            unit_move,
            ReassignmentPlan {
                release_old_unit: true,
                clear_old_tenant: true,
                occupy_new_unit: true,
                assign_new_tenant: true,
            }
        );

        // Old unit stays Occupied when another Active lease still claims it.
        let shared_move = plan_reassignment(true, true, false, true);
        assert!(!shared_move.release_old_unit);
        assert!(shared_move.occupy_new_unit);

        let tenant_only = plan_reassignment(true, false, true, false);
        assert_eq!(
            tenant_only,
            ReassignmentPlan {
                release_old_unit: false,
                clear_old_tenant: true,
                occupy_new_unit: false,
                assign_new_tenant: true,
            }
        );

        assert_eq!(
            plan_reassignment(true, false, false, false),
            ReassignmentPlan::default()
        );
    }

    #[test]
    fn receipt_numbers_zero_pad_the_daily_sequence() {
        let day = date(2026, 3, 7);
        assert_eq!(receipt_number(day, 1), "RCP-20260307-001");
        assert_eq!(receipt_number(day, 42), "RCP-20260307-042");
        assert_eq!(receipt_number(day, 1234), "RCP-20260307-1234");
    }

    #[test]
    fn status_literals_round_trip() {
        for status in [
            LeaseStatus::Pending,
            LeaseStatus::Active,
            LeaseStatus::Terminated,
        ] {
            assert_eq!(LeaseStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeaseStatus::parse("Month-to-Month"), None);
        assert_eq!(LeaseStatus::parse("active"), None);

        assert_eq!(UnitStatus::UnderMaintenance.as_str(), "UnderMaintenance");
        assert_eq!(PaymentStatus::parse("Partial"), Some(PaymentStatus::Partial));
        assert_eq!(PaymentStatus::parse("Overdue"), None);
    }
}
