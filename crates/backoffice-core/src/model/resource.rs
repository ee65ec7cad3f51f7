// ── Resource catalog ──
//
// Every back-office resource module follows the same list/detail/form
// pattern. This table is the single place that knows how each one is
// addressed and what extras it supports.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A table column: JSON field path plus header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub title: &'static str,
}

const fn col(key: &'static str, title: &'static str) -> Column {
    Column { key, title }
}

/// Server-side transitions exposed as `POST /{resource}/{id}/{action}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DomainAction {
    Post,
    Accept,
    Reject,
    Approve,
    Close,
    Reopen,
}

impl DomainAction {
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Approve => "approve",
            Self::Close => "close",
            Self::Reopen => "reopen",
        }
    }

    /// Past-tense label for the default success toast.
    pub fn done_label(self) -> &'static str {
        match self {
            Self::Post => "Posted",
            Self::Accept => "Accepted",
            Self::Reject => "Rejected",
            Self::Approve => "Approved",
            Self::Close => "Closed",
            Self::Reopen => "Reopened",
        }
    }
}

/// Every resource module of the back office.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Resource {
    // HR
    Employees,
    Departments,
    JobTitles,
    Shifts,
    Attendance,
    LeaveTypes,
    LeaveRequests,
    Holidays,
    Payrolls,
    SalaryComponents,
    EmployeeLoans,
    // Accounting
    Accounts,
    CostCenters,
    JournalEntries,
    AccountLinks,
    FinancialYears,
    FinancialPeriods,
    // Parties
    Vendors,
    Customers,
    // Treasury
    Banks,
    BankAccounts,
    Safes,
    Currencies,
    ExchangeRates,
    // Organization
    Branches,
}

/// Navigation group a resource belongs to (TUI tab, CLI help grouping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ResourceGroup {
    #[strum(serialize = "HR")]
    Hr,
    Accounting,
    Parties,
    Treasury,
    Organization,
}

impl Resource {
    /// REST path segment under the API root.
    pub fn path(self) -> &'static str {
        match self {
            Self::Attendance => "attendances",
            other => other.into(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Employees => "Employees",
            Self::Departments => "Departments",
            Self::JobTitles => "Job titles",
            Self::Shifts => "Shifts",
            Self::Attendance => "Attendance",
            Self::LeaveTypes => "Leave types",
            Self::LeaveRequests => "Leave requests",
            Self::Holidays => "Holidays",
            Self::Payrolls => "Payrolls",
            Self::SalaryComponents => "Salary components",
            Self::EmployeeLoans => "Employee loans",
            Self::Accounts => "Chart of accounts",
            Self::CostCenters => "Cost centers",
            Self::JournalEntries => "Journal entries",
            Self::AccountLinks => "Account links",
            Self::FinancialYears => "Financial years",
            Self::FinancialPeriods => "Financial periods",
            Self::Vendors => "Vendors",
            Self::Customers => "Customers",
            Self::Banks => "Banks",
            Self::BankAccounts => "Bank accounts",
            Self::Safes => "Safes",
            Self::Currencies => "Currencies",
            Self::ExchangeRates => "Exchange rates",
            Self::Branches => "Branches",
        }
    }

    pub fn group(self) -> ResourceGroup {
        match self {
            Self::Employees
            | Self::Departments
            | Self::JobTitles
            | Self::Shifts
            | Self::Attendance
            | Self::LeaveTypes
            | Self::LeaveRequests
            | Self::Holidays
            | Self::Payrolls
            | Self::SalaryComponents
            | Self::EmployeeLoans => ResourceGroup::Hr,
            Self::Accounts
            | Self::CostCenters
            | Self::JournalEntries
            | Self::AccountLinks
            | Self::FinancialYears
            | Self::FinancialPeriods => ResourceGroup::Accounting,
            Self::Vendors | Self::Customers => ResourceGroup::Parties,
            Self::Banks | Self::BankAccounts | Self::Safes | Self::Currencies | Self::ExchangeRates => {
                ResourceGroup::Treasury
            }
            Self::Branches => ResourceGroup::Organization,
        }
    }

    /// Table columns shown in list views, after the id column.
    pub fn columns(self) -> &'static [Column] {
        const NAMED: &[Column] = &[col("name", "Name"), col("name_ar", "Arabic name")];
        match self {
            Self::Employees => const { &[
                col("code", "Code"),
                col("name", "Name"),
                col("department.name", "Department"),
                col("job_title.name", "Job title"),
                col("is_active", "Active"),
            ] },
            Self::Attendance => const { &[
                col("employee.name", "Employee"),
                col("date", "Date"),
                col("check_in", "In"),
                col("check_out", "Out"),
            ] },
            Self::LeaveRequests => const { &[
                col("employee.name", "Employee"),
                col("leave_type.name", "Type"),
                col("from_date", "From"),
                col("to_date", "To"),
                col("status", "Status"),
            ] },
            Self::Holidays => const { &[col("name", "Name"), col("from_date", "From"), col("to_date", "To")] },
            Self::Payrolls => const { &[
                col("employee.name", "Employee"),
                col("month", "Month"),
                col("net_salary", "Net"),
                col("status", "Status"),
            ] },
            Self::EmployeeLoans => const { &[
                col("employee.name", "Employee"),
                col("amount", "Amount"),
                col("installments", "Installments"),
                col("status", "Status"),
            ] },
            Self::Accounts | Self::CostCenters => const { &[
                col("code", "Code"),
                col("name", "Name"),
                col("category", "Category"),
                col("is_active", "Active"),
            ] },
            Self::JournalEntries => const { &[
                col("number", "Number"),
                col("date", "Date"),
                col("description", "Description"),
                col("total_debit", "Debit"),
                col("total_credit", "Credit"),
                col("status", "Status"),
            ] },
            Self::AccountLinks => const { &[col("key", "Role"), col("account.name", "Account")] },
            Self::FinancialYears | Self::FinancialPeriods => const { &[
                col("name", "Name"),
                col("start_date", "Start"),
                col("end_date", "End"),
                col("status", "Status"),
            ] },
            Self::Vendors | Self::Customers => const { &[
                col("name", "Name"),
                col("phone", "Phone"),
                col("email", "Email"),
                col("is_active", "Active"),
            ] },
            Self::BankAccounts => const { &[
                col("bank.name", "Bank"),
                col("account_number", "Account no."),
                col("currency.code", "Currency"),
                col("is_active", "Active"),
            ] },
            Self::Currencies => const { &[
                col("code", "Code"),
                col("name", "Name"),
                col("symbol", "Symbol"),
                col("is_default", "Default"),
            ] },
            Self::ExchangeRates => const { &[
                col("currency.code", "Currency"),
                col("rate", "Rate"),
                col("effective_date", "Effective"),
            ] },
            Self::Departments
            | Self::JobTitles
            | Self::Shifts
            | Self::LeaveTypes
            | Self::SalaryComponents
            | Self::Banks
            | Self::Safes
            | Self::Branches => NAMED,
        }
    }

    /// Whether `PATCH /{path}/{id}/toggle-status` exists.
    pub fn supports_toggle(self) -> bool {
        matches!(
            self,
            Self::Employees
                | Self::Departments
                | Self::JobTitles
                | Self::Shifts
                | Self::LeaveTypes
                | Self::SalaryComponents
                | Self::Accounts
                | Self::CostCenters
                | Self::Vendors
                | Self::Customers
                | Self::Banks
                | Self::BankAccounts
                | Self::Safes
                | Self::Currencies
                | Self::Branches
        )
    }

    /// Domain transitions the backend exposes for this resource.
    pub fn actions(self) -> &'static [DomainAction] {
        match self {
            Self::JournalEntries => &[DomainAction::Accept, DomainAction::Post],
            Self::LeaveRequests | Self::EmployeeLoans => {
                &[DomainAction::Approve, DomainAction::Reject]
            }
            Self::Payrolls => &[DomainAction::Approve],
            Self::FinancialYears | Self::FinancialPeriods => {
                &[DomainAction::Close, DomainAction::Reopen]
            }
            _ => &[],
        }
    }

    pub fn supports_action(self, action: DomainAction) -> bool {
        self.actions().contains(&action)
    }

    /// Hierarchical resources served by `GET /{path}/tree`.
    pub fn is_tree(self) -> bool {
        matches!(self, Self::Accounts | Self::CostCenters)
    }

    /// Resources whose writes go out as multipart with `attachments[]`.
    pub fn accepts_attachments(self) -> bool {
        matches!(
            self,
            Self::JournalEntries | Self::LeaveRequests | Self::EmployeeLoans
        )
    }
}
