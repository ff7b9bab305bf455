use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::utils::time_format::hhmm_option;

/// How an employee's attendance is evidenced. On-site staff have biometric
/// first-in/last-out times; remote staff only have daily call activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeCategory {
    OnSite,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Amina Rahman",
        "email": "amina@company.com",
        "category": "on_site",
        "is_active": true,
        "shift_start": "09:30",
        "shift_end": "18:30"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Amina Rahman")]
    pub name: String,

    #[schema(example = "amina@company.com", nullable = true)]
    pub email: Option<String>,

    pub category: EmployeeCategory,

    #[schema(example = true)]
    pub is_active: bool,

    #[serde(default, with = "hhmm_option")]
    #[schema(example = "09:30", value_type = Option<String>)]
    pub shift_start: Option<NaiveTime>,

    #[serde(default, with = "hhmm_option")]
    #[schema(example = "18:30", value_type = Option<String>)]
    pub shift_end: Option<NaiveTime>,
}

impl Employee {
    /// Expected arrival and departure, falling back to 10:00-19:00.
    pub fn shift(&self) -> (NaiveTime, NaiveTime) {
        let start = self
            .shift_start
            .unwrap_or_else(|| NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default());
        let end = self
            .shift_end
            .unwrap_or_else(|| NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default());
        (start, end)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewEmployee {
    #[schema(example = "Amina Rahman")]
    pub name: String,
    #[schema(example = "amina@company.com")]
    pub email: Option<String>,
    pub category: EmployeeCategory,
    #[serde(default, with = "hhmm_option")]
    #[schema(example = "09:30", value_type = Option<String>)]
    pub shift_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option")]
    #[schema(example = "18:30", value_type = Option<String>)]
    pub shift_end: Option<NaiveTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn employee(shift_start: Option<NaiveTime>, shift_end: Option<NaiveTime>) -> Employee {
        Employee {
            id: 7,
            name: "Omar".into(),
            email: None,
            category: EmployeeCategory::OnSite,
            is_active: true,
            shift_start,
            shift_end,
        }
    }

    #[test]
    fn shift_defaults_to_ten_to_seven() {
        let (start, end) = employee(None, None).shift();
        assert_eq!(start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(19, 0, 0).unwrap());

        let custom = NaiveTime::from_hms_opt(8, 30, 0);
        assert_eq!(employee(custom, None).shift().0, custom.unwrap());
    }

    #[test]
    fn category_column_values() {
        assert_eq!(EmployeeCategory::OnSite.as_ref(), "on_site");
        assert_eq!(EmployeeCategory::from_str("remote").unwrap(), EmployeeCategory::Remote);
        assert!(EmployeeCategory::from_str("hybrid").is_err());
    }
}
