use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Company-wide day off on top of Sundays. One per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "date": "2024-03-26", "name": "Independence Day" }))]
pub struct Holiday {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Independence Day")]
    pub name: String,
}
