//! Embedded, versioned DDL migrations.
//!
//! Applied at startup when a pool is configured. Each migration runs in its
//! own transaction and is recorded in `_migrations`, so restarts are
//! idempotent.

use sqlx::PgPool;

use crate::error::AppError;

struct Migration {
    version: i32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS _migrations (
    version     integer PRIMARY KEY,
    name        text NOT NULL,
    applied_at  timestamptz NOT NULL DEFAULT now()
)";

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "core_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "receipt_counters",
        sql: SCHEMA_V2,
    },
];

// Statuses are stored as the capitalized literals the API speaks; CHECK
// constraints keep out anything the application never writes.
const SCHEMA_V1: &str = "\
CREATE TABLE IF NOT EXISTS properties (
    id           uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    landlord_id  uuid NOT NULL,
    name         text NOT NULL,
    created_at   timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS units (
    id           uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    property_id  uuid NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    unit_number  text NOT NULL,
    status       text NOT NULL DEFAULT 'Available'
                 CHECK (status IN ('Available', 'Occupied', 'UnderMaintenance')),
    created_at   timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS tenants (
    id           uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    landlord_id  uuid NOT NULL,
    first_name   text NOT NULL,
    last_name    text NOT NULL,
    email        text NOT NULL,
    unit_id      uuid REFERENCES units(id) ON DELETE SET NULL,
    created_at   timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS leases (
    id                 uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    landlord_id        uuid NOT NULL,
    tenant_id          uuid NOT NULL REFERENCES tenants(id),
    unit_id            uuid NOT NULL REFERENCES units(id),
    start_date         date NOT NULL,
    end_date           date NOT NULL,
    monthly_rent       numeric(10,2) NOT NULL,
    security_deposit   numeric(10,2) NOT NULL,
    payment_frequency  text NOT NULL DEFAULT 'Monthly',
    status             text NOT NULL DEFAULT 'Pending'
                       CHECK (status IN ('Pending', 'Active', 'Terminated')),
    notes              text,
    created_at         timestamptz NOT NULL DEFAULT now()
);

-- At most one Active lease per unit, enforced by the database so two racing
-- activations cannot both commit.
CREATE UNIQUE INDEX IF NOT EXISTS ux_leases_unit_id_active
    ON leases (unit_id) WHERE status = 'Active';

CREATE INDEX IF NOT EXISTS ix_leases_landlord_created
    ON leases (landlord_id, created_at DESC);

CREATE TABLE IF NOT EXISTS lease_activities (
    id                   uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    lease_id             uuid NOT NULL REFERENCES leases(id) ON DELETE CASCADE,
    old_status           text NOT NULL,
    new_status           text NOT NULL,
    changed_at           timestamptz NOT NULL DEFAULT now(),
    changed_by_user_id   uuid NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_lease_activities_lease
    ON lease_activities (lease_id, changed_at DESC);

CREATE TABLE IF NOT EXISTS payments (
    id              uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    lease_id        uuid NOT NULL REFERENCES leases(id) ON DELETE CASCADE,
    landlord_id     uuid NOT NULL,
    amount_paid     numeric(10,2) NOT NULL,
    payment_date    date NOT NULL,
    payment_method  text NOT NULL DEFAULT 'E-Transfer',
    status          text NOT NULL DEFAULT 'Pending'
                    CHECK (status IN ('Paid', 'Partial', 'Late', 'Pending')),
    period_month    integer NOT NULL CHECK (period_month BETWEEN 1 AND 12),
    period_year     integer NOT NULL,
    late_fee        numeric(10,2) NOT NULL DEFAULT 0,
    notes           text,
    receipt_number  text NOT NULL,
    created_at      timestamptz NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS ix_payments_landlord_date
    ON payments (landlord_id, payment_date DESC);
";

// Receipt numbers are allocated from a per-landlord-per-day counter row so
// concurrent inserts cannot hand out the same daily sequence.
const SCHEMA_V2: &str = "\
CREATE TABLE IF NOT EXISTS receipt_counters (
    landlord_id   uuid NOT NULL,
    receipt_date  date NOT NULL,
    last_seq      integer NOT NULL DEFAULT 0,
    PRIMARY KEY (landlord_id, receipt_date)
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_payments_landlord_receipt
    ON payments (landlord_id, receipt_number);
";

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(MIGRATIONS_TABLE_DDL)
        .execute(pool)
        .await
        .map_err(migration_error)?;

    let applied: Vec<i32> = sqlx::query_scalar("SELECT version FROM _migrations")
        .fetch_all(pool)
        .await
        .map_err(migration_error)?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let mut tx = pool.begin().await.map_err(migration_error)?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(migration_error)?;
        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(migration_error)?;
        tx.commit().await.map_err(migration_error)?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied database migration"
        );
    }

    Ok(())
}

fn migration_error(error: sqlx::Error) -> AppError {
    AppError::Dependency(format!("Database migration failed: {error}"))
}

#[cfg(test)]
mod tests {
    use super::MIGRATIONS;

    #[test]
    fn versions_are_unique_and_ascending() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn active_lease_exclusivity_is_a_partial_unique_index() {
        let schema = MIGRATIONS
            .iter()
            .find(|m| m.name == "core_schema")
            .expect("core schema migration")
            .sql;
        assert!(schema.contains("ux_leases_unit_id_active"));
        assert!(schema.contains("ON leases (unit_id) WHERE status = 'Active'"));
    }

    #[test]
    fn receipt_counter_table_is_keyed_per_landlord_day() {
        let schema = MIGRATIONS
            .iter()
            .find(|m| m.name == "receipt_counters")
            .expect("receipt counters migration")
            .sql;
        assert!(schema.contains("PRIMARY KEY (landlord_id, receipt_date)"));
    }
}
