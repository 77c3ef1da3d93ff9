//! Typed capability keys
//!
//! A `Resource` names a domain entity family. It is used both as the first
//! half of a permission key and to address the entity's REST endpoints.
//! An `Action` is the second half of the permission key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Domain entity families managed by the dashboard backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Bank,
    Customer,
    Driver,
    DriverSalary,
    Expense,
    Invoice,
    Loan,
    Part,
    Payment,
    Pump,
    Route,
    Subtrip,
    Tenant,
    Transporter,
    TransporterPayment,
    Trip,
    Tyre,
    User,
    Vehicle,
    Vendor,
    WorkOrder,
}

impl Resource {
    /// Every resource, in declaration order
    pub const ALL: [Resource; 21] = [
        Resource::Bank,
        Resource::Customer,
        Resource::Driver,
        Resource::DriverSalary,
        Resource::Expense,
        Resource::Invoice,
        Resource::Loan,
        Resource::Part,
        Resource::Payment,
        Resource::Pump,
        Resource::Route,
        Resource::Subtrip,
        Resource::Tenant,
        Resource::Transporter,
        Resource::TransporterPayment,
        Resource::Trip,
        Resource::Tyre,
        Resource::User,
        Resource::Vehicle,
        Resource::Vendor,
        Resource::WorkOrder,
    ];

    /// Permission-map key (camelCase, as the backend sends it)
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Bank => "bank",
            Resource::Customer => "customer",
            Resource::Driver => "driver",
            Resource::DriverSalary => "driverSalary",
            Resource::Expense => "expense",
            Resource::Invoice => "invoice",
            Resource::Loan => "loan",
            Resource::Part => "part",
            Resource::Payment => "payment",
            Resource::Pump => "pump",
            Resource::Route => "route",
            Resource::Subtrip => "subtrip",
            Resource::Tenant => "tenant",
            Resource::Transporter => "transporter",
            Resource::TransporterPayment => "transporterPayment",
            Resource::Trip => "trip",
            Resource::Tyre => "tyre",
            Resource::User => "user",
            Resource::Vehicle => "vehicle",
            Resource::Vendor => "vendor",
            Resource::WorkOrder => "workOrder",
        }
    }

    /// REST path segment under `/api`
    pub fn endpoint(&self) -> &'static str {
        match self {
            Resource::Bank => "banks",
            Resource::Customer => "customers",
            Resource::Driver => "drivers",
            Resource::DriverSalary => "driver-salaries",
            Resource::Expense => "expenses",
            Resource::Invoice => "invoices",
            Resource::Loan => "loans",
            Resource::Part => "parts",
            Resource::Payment => "payments",
            Resource::Pump => "pumps",
            Resource::Route => "routes",
            Resource::Subtrip => "subtrips",
            Resource::Tenant => "tenants",
            Resource::Transporter => "transporters",
            Resource::TransporterPayment => "transporter-payments",
            Resource::Trip => "trips",
            Resource::Tyre => "tyres",
            Resource::User => "users",
            Resource::Vehicle => "vehicles",
            Resource::Vendor => "vendors",
            Resource::WorkOrder => "work-orders",
        }
    }

    /// Human-readable name used in notifications, e.g. "Work order"
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Bank => "Bank",
            Resource::Customer => "Customer",
            Resource::Driver => "Driver",
            Resource::DriverSalary => "Driver salary",
            Resource::Expense => "Expense",
            Resource::Invoice => "Invoice",
            Resource::Loan => "Loan",
            Resource::Part => "Part",
            Resource::Payment => "Payment",
            Resource::Pump => "Pump",
            Resource::Route => "Route",
            Resource::Subtrip => "Subtrip",
            Resource::Tenant => "Tenant",
            Resource::Transporter => "Transporter",
            Resource::TransporterPayment => "Transporter payment",
            Resource::Trip => "Trip",
            Resource::Tyre => "Tyre",
            Resource::User => "User",
            Resource::Vehicle => "Vehicle",
            Resource::Vendor => "Vendor",
            Resource::WorkOrder => "Work order",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip separators and case so `work_order`, `work-order` and `workOrder` all match
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s.trim());
        Resource::ALL
            .into_iter()
            .find(|r| normalize(r.as_str()) == wanted)
            .ok_or_else(|| Error::UnknownResource(s.to_string()))
    }
}

/// Operations guarded by the permission map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}
