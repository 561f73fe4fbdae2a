//! Initial database migration.
//!
//! Creates the tenant, employee, policy, balance, application and
//! subscription tables. Balance invariants are enforced structurally:
//! `available` is a generated column and every stored counter carries a
//! non-negative CHECK.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS & PEOPLE
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(EMPLOYEES_SQL).await?;

        // ============================================================
        // PART 3: SUBSCRIPTIONS
        // ============================================================
        db.execute_unprepared(PLANS_SQL).await?;
        db.execute_unprepared(SUBSCRIPTIONS_SQL).await?;

        // ============================================================
        // PART 4: LEAVE LEDGER
        // ============================================================
        db.execute_unprepared(LEAVE_POLICIES_SQL).await?;
        db.execute_unprepared(LEAVE_BALANCES_SQL).await?;
        db.execute_unprepared(LEAVE_APPLICATIONS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 6: SEED DATA
        // ============================================================
        db.execute_unprepared(SEED_PLANS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE employee_role AS ENUM ('SUPER_ADMIN', 'HR_ADMIN', 'MANAGER', 'EMPLOYEE');

CREATE TYPE leave_type AS ENUM (
    'CASUAL_LEAVE',
    'SICK_LEAVE',
    'EARNED_LEAVE',
    'LOSS_OF_PAY',
    'COMP_OFF',
    'OPTIONAL_HOLIDAY'
);

CREATE TYPE leave_status AS ENUM ('PENDING', 'APPROVED', 'REJECTED', 'CANCELLED');

CREATE TYPE subscription_status AS ENUM ('ACTIVE', 'TRIAL', 'EXPIRED', 'CANCELLED');
";

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const EMPLOYEES_SQL: &str = r"
CREATE TABLE employees (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    manager_id UUID REFERENCES employees(id) ON DELETE SET NULL,
    role employee_role NOT NULL DEFAULT 'EMPLOYEE',
    email VARCHAR(255) NOT NULL,
    full_name VARCHAR(255) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, email),
    CHECK (manager_id IS NULL OR manager_id <> id)
);

CREATE INDEX idx_employees_company ON employees(company_id);
CREATE INDEX idx_employees_manager ON employees(manager_id) WHERE manager_id IS NOT NULL;
";

const PLANS_SQL: &str = r"
CREATE TABLE plans (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL UNIQUE,
    max_employees INTEGER,
    has_multiple_leave_policies BOOLEAN NOT NULL DEFAULT false,
    has_attendance_management BOOLEAN NOT NULL DEFAULT false,
    has_reports_download BOOLEAN NOT NULL DEFAULT false,
    has_attendance_rate_analytics BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const SUBSCRIPTIONS_SQL: &str = r"
CREATE TABLE subscriptions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    plan_id UUID NOT NULL REFERENCES plans(id),
    status subscription_status NOT NULL DEFAULT 'TRIAL',
    starts_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    ends_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK (ends_at IS NULL OR ends_at > starts_at)
);

CREATE INDEX idx_subscriptions_company ON subscriptions(company_id, created_at DESC);
";

const LEAVE_POLICIES_SQL: &str = r"
CREATE TABLE leave_policies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    leave_type leave_type NOT NULL,
    annual_quota NUMERIC(6, 2) NOT NULL DEFAULT 0 CHECK (annual_quota >= 0),
    carry_forward BOOLEAN NOT NULL DEFAULT false,
    max_carry_forward NUMERIC(6, 2) NOT NULL DEFAULT 0 CHECK (max_carry_forward >= 0),
    half_day_allowed BOOLEAN NOT NULL DEFAULT true,
    requires_hr_approval BOOLEAN NOT NULL DEFAULT false,
    active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, leave_type)
);
";

const LEAVE_BALANCES_SQL: &str = r"
CREATE TABLE leave_balances (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    employee_id UUID NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    leave_type leave_type NOT NULL,
    year INTEGER NOT NULL,
    total_quota NUMERIC(6, 2) NOT NULL DEFAULT 0 CHECK (total_quota >= 0),
    used NUMERIC(6, 2) NOT NULL DEFAULT 0 CHECK (used >= 0),
    pending NUMERIC(6, 2) NOT NULL DEFAULT 0 CHECK (pending >= 0),
    carried_forward NUMERIC(6, 2) NOT NULL DEFAULT 0 CHECK (carried_forward >= 0),
    available NUMERIC(6, 2) GENERATED ALWAYS AS
        (total_quota + carried_forward - used - pending) STORED,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (employee_id, leave_type, year)
);

CREATE INDEX idx_leave_balances_year ON leave_balances(leave_type, year);
";

const LEAVE_APPLICATIONS_SQL: &str = r"
CREATE TABLE leave_applications (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    employee_id UUID NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    leave_type leave_type NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    number_of_days NUMERIC(6, 2) NOT NULL CHECK (number_of_days > 0),
    is_half_day BOOLEAN NOT NULL DEFAULT false,
    reason TEXT NOT NULL,
    attachment_ref VARCHAR(500),
    status leave_status NOT NULL DEFAULT 'PENDING',
    requires_hr_approval BOOLEAN NOT NULL,
    reviewing_manager_id UUID REFERENCES employees(id) ON DELETE SET NULL,
    manager_approved_by UUID REFERENCES employees(id),
    manager_approved_at TIMESTAMPTZ,
    hr_approved_by UUID REFERENCES employees(id),
    hr_approved_at TIMESTAMPTZ,
    rejected_by UUID REFERENCES employees(id),
    rejection_reason TEXT,
    rejected_at TIMESTAMPTZ,
    version INTEGER NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK (end_date >= start_date),
    CHECK ((manager_approved_by IS NULL) = (manager_approved_at IS NULL)),
    CHECK ((hr_approved_by IS NULL) = (hr_approved_at IS NULL)),
    CHECK ((rejected_by IS NULL) = (rejected_at IS NULL)),
    CHECK (rejection_reason IS NULL OR rejected_at IS NOT NULL),
    CHECK ((status = 'REJECTED') = (rejected_at IS NOT NULL))
);

CREATE INDEX idx_leave_apps_employee_dates ON leave_applications(employee_id, start_date, end_date)
    WHERE status IN ('PENDING', 'APPROVED');
CREATE INDEX idx_leave_apps_employee_created ON leave_applications(employee_id, created_at DESC);
CREATE INDEX idx_leave_apps_manager_queue ON leave_applications(reviewing_manager_id, created_at)
    WHERE status = 'PENDING' AND manager_approved_at IS NULL;
CREATE INDEX idx_leave_apps_hr_queue ON leave_applications(company_id, created_at)
    WHERE status = 'PENDING' AND requires_hr_approval;
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION prevent_terminal_leave_update()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'PENDING' THEN
        RAISE EXCEPTION 'leave application % is % and cannot change', OLD.id, OLD.status;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_leave_applications_terminal
    BEFORE UPDATE ON leave_applications
    FOR EACH ROW EXECUTE FUNCTION prevent_terminal_leave_update();
";

const SEED_PLANS_SQL: &str = r"
INSERT INTO plans (name, max_employees, has_multiple_leave_policies, has_attendance_management,
                   has_reports_download, has_attendance_rate_analytics)
VALUES
    ('FREE', 10, false, false, false, false),
    ('STARTER', 50, true, true, false, false),
    ('PROFESSIONAL', 250, true, true, true, true),
    ('ENTERPRISE', NULL, true, true, true, true);
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_leave_applications_terminal ON leave_applications;
DROP FUNCTION IF EXISTS prevent_terminal_leave_update();
DROP TABLE IF EXISTS leave_applications CASCADE;
DROP TABLE IF EXISTS leave_balances CASCADE;
DROP TABLE IF EXISTS leave_policies CASCADE;
DROP TABLE IF EXISTS subscriptions CASCADE;
DROP TABLE IF EXISTS plans CASCADE;
DROP TABLE IF EXISTS employees CASCADE;
DROP TABLE IF EXISTS companies CASCADE;
DROP TYPE IF EXISTS subscription_status;
DROP TYPE IF EXISTS leave_status;
DROP TYPE IF EXISTS leave_type;
DROP TYPE IF EXISTS employee_role;
";
