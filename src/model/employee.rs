use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "position": "Backend Developer",
        "start_date": "2024-01-01",
        "status": "active",
        "is_admin": false
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "Backend Developer")]
    pub position: String,

    /// Hire date; every accrual is measured from here.
    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub start_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,

    #[schema(example = false)]
    pub is_admin: bool,
}

/// Insert payload for a new employee profile.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct NewEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john@email.com", format = "email")]
    pub email: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "Backend Developer")]
    pub position: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[serde(default)]
    #[schema(example = false)]
    pub is_admin: bool,
}

/// Employment states an admin may set.
pub const EMPLOYEE_STATUSES: [&str; 3] = ["active", "inactive", "terminated"];

/// Admin update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct UpdateEmployee {
    #[schema(example = "Jane")]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: Option<String>,
    #[schema(example = "Platform")]
    pub department: Option<String>,
    pub position: Option<String>,
    #[schema(example = "2024-01-01", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "inactive")]
    pub status: Option<String>,
    pub is_admin: Option<bool>,
}

impl UpdateEmployee {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fields employees may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[schema(example = "Jane")]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: Option<String>,
}

impl From<ProfileUpdate> for UpdateEmployee {
    fn from(profile: ProfileUpdate) -> Self {
        Self {
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            ..Self::default()
        }
    }
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AdminStats {
    /// Employees whose status is `active`.
    #[schema(example = 42)]
    pub total_employees: u64,
    /// Active employees whose start date falls in the current month.
    #[schema(example = 3)]
    pub new_hires: u64,
    #[schema(example = 5)]
    pub pending_approvals: u64,
}
