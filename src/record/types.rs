//! Request and response shapes of the record-storage API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters for a `fetch` call: projection, filters, ordering, paging.
///
/// # Examples
///
/// ```
/// use inkdrop::record::{Condition, FetchParams, OrderBy};
///
/// let params = FetchParams::new()
///     .fields(["Id", "title_c"])
///     .filter(Condition::equal_to("notebook_id_c", 2))
///     .order_by(OrderBy::descending("ModifiedOn"))
///     .page(10, 0);
///
/// let json = serde_json::to_value(&params).unwrap();
/// assert_eq!(json["where"][0]["fieldName"], "notebook_id_c");
/// assert_eq!(json["orderBy"][0]["sorttype"], "DESC");
/// assert_eq!(json["pagingInfo"]["limit"], 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchParams {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(rename = "orderBy", skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(rename = "pagingInfo", skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

impl FetchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.paging = Some(Paging { limit, offset });
        self
    }
}

/// A single `where` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field_name: String,
    pub operator: Operator,
    pub values: Vec<Value>,
}

impl Condition {
    pub fn equal_to(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field_name: field.into(),
            operator: Operator::EqualTo,
            values: vec![value.into()],
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field_name: field.into(),
            operator: Operator::Contains,
            values: vec![value.into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    EqualTo,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub field_name: String,
    #[serde(rename = "sorttype")]
    pub direction: Direction,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field_name: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field_name: field.into(),
            direction: Direction::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub limit: usize,
    pub offset: usize,
}

/// Response of `fetch` and `get_by_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Message to report when the envelope signals failure.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "record API reported failure".to_string())
    }
}

/// Response of the batch calls `create`, `update` and `delete`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchEnvelope {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<RecordResult>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BatchEnvelope {
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "record API reported failure".to_string())
    }

    /// Every record that the API reported as failed, by position in the batch.
    pub fn failures(&self) -> Vec<RecordFailure> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.success)
            .map(|(index, r)| RecordFailure {
                index,
                message: r
                    .message
                    .clone()
                    .unwrap_or_else(|| "record rejected".to_string()),
            })
            .collect()
    }
}

/// Outcome for one record in a batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A record that failed inside an otherwise accepted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub index: usize,
    pub message: String,
}
