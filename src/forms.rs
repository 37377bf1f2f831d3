//! Form schemas. Every submission is checked field by field against a schema
//! before anything reaches the gateway; unknown keys are dropped.

use crate::db::models::{Direction, MachineStatus, NewMachine, OrderStatus, OrderType, Role};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub type Validator = fn(&Value) -> Result<(), String>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Trimmed, non-blank text.
    Text,
    /// Text taken verbatim, e.g. passwords.
    Secret,
    Email,
    Integer,
    Float,
    Decimal,
    Uuid,
    Choice(&'static [&'static str]),
}

#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Used when an optional field is left out.
    pub default: Option<&'static str>,
    pub validator: Option<Validator>,
}

impl FieldSpec {
    const fn required(name: &'static str, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            kind,
            required: true,
            default: None,
            validator: None,
        }
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            kind,
            required: false,
            default: None,
            validator: None,
        }
    }

    const fn or(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    const fn check(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("The form body must be a JSON object")]
    NotAnObject,
    #[error("The following required parameters were not provided: {}", .0.iter().join(", "))]
    Missing(Vec<&'static str>),
    #[error("'{field}' {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug)]
pub struct FormSchema {
    pub fields: &'static [FieldSpec],
}

/// Blank strings from empty inputs count as "not provided".
fn provided(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn coerce(kind: FieldKind, raw: &Value) -> Result<Value, String> {
    match kind {
        FieldKind::Text => raw
            .as_str()
            .map(|s| Value::String(s.trim().to_owned()))
            .ok_or_else(|| String::from("must be text")),
        FieldKind::Secret => raw
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| String::from("must be text")),
        FieldKind::Email => raw
            .as_str()
            .map(str::trim)
            .filter(|s| EMAIL.is_match(s))
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| String::from("must be an email address")),
        FieldKind::Integer => {
            let parsed = match raw {
                Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
                Value::String(s) => s.trim().parse::<i32>().ok(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| String::from("must be a whole number"))
        }
        FieldKind::Float => {
            let parsed = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .filter(|f| f.is_finite())
                .map(Value::from)
                .ok_or_else(|| String::from("must be a number"))
        }
        FieldKind::Decimal => {
            let parsed = match raw {
                Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
                Value::String(s) => Decimal::from_str(s.trim()).ok(),
                _ => None,
            };
            parsed
                .map(|d| Value::String(d.to_string()))
                .ok_or_else(|| String::from("must be a decimal amount"))
        }
        FieldKind::Uuid => raw
            .as_str()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(|id| Value::String(id.to_string()))
            .ok_or_else(|| String::from("must be a valid id")),
        FieldKind::Choice(options) => raw
            .as_str()
            .filter(|s| options.contains(s))
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| format!("must be one of: {}", options.iter().join(", "))),
    }
}

impl FormSchema {
    /// Checks `body` and returns the normalized fields, one entry per schema
    /// field. Absent optional fields come back as their default or null.
    pub fn validate(&self, body: &Value) -> Result<Map<String, Value>, FormError> {
        let body = body.as_object().ok_or(FormError::NotAnObject)?;

        let missing: Vec<&'static str> = self
            .fields
            .iter()
            .filter(|field| field.required && provided(body.get(field.name)).is_none())
            .map(|field| field.name)
            .collect();
        if !missing.is_empty() {
            return Err(FormError::Missing(missing));
        }

        let mut fields = Map::new();
        for field in self.fields {
            let value = match provided(body.get(field.name)) {
                Some(raw) => coerce(field.kind, raw).map_err(|reason| FormError::Invalid {
                    field: field.name,
                    reason,
                })?,
                None => match field.default {
                    Some(default) => Value::String(default.to_owned()),
                    None => Value::Null,
                },
            };
            if let (Some(validator), false) = (field.validator, value.is_null()) {
                validator(&value).map_err(|reason| FormError::Invalid {
                    field: field.name,
                    reason,
                })?;
            }
            fields.insert(field.name.to_owned(), value);
        }
        Ok(fields)
    }

    /// Validates and deserializes in one step.
    pub fn parse<T: DeserializeOwned>(&self, body: &Value) -> Result<T, FormError> {
        let fields = self.validate(body)?;
        serde_json::from_value(Value::Object(fields)).map_err(|e| FormError::Invalid {
            field: "form",
            reason: e.to_string(),
        })
    }
}

fn positive(value: &Value) -> Result<(), String> {
    match value.as_i64() {
        Some(n) if n > 0 => Ok(()),
        _ => Err(String::from("must be greater than zero")),
    }
}

fn non_negative(value: &Value) -> Result<(), String> {
    match value.as_i64() {
        Some(n) if n >= 0 => Ok(()),
        _ => Err(String::from("cannot be negative")),
    }
}

fn positive_amount(value: &Value) -> Result<(), String> {
    match value.as_str().and_then(|s| Decimal::from_str(s).ok()) {
        Some(amount) if amount > Decimal::ZERO => Ok(()),
        _ => Err(String::from("must be greater than zero")),
    }
}

fn latitude(value: &Value) -> Result<(), String> {
    match value.as_f64() {
        Some(lat) if (-90.0..=90.0).contains(&lat) => Ok(()),
        _ => Err(String::from("must be between -90 and 90")),
    }
}

fn longitude(value: &Value) -> Result<(), String> {
    match value.as_f64() {
        Some(lng) if (-180.0..=180.0).contains(&lng) => Ok(()),
        _ => Err(String::from("must be between -180 and 180")),
    }
}

fn password(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if s.chars().count() >= 6 => Ok(()),
        _ => Err(String::from("must be at least 6 characters")),
    }
}

const MACHINE_STATUSES: &[&str] = &["active", "maintenance", "low_stock", "inactive"];
const ORDER_STATUSES: &[&str] = &["open", "in_progress", "done"];
const ORDER_TYPES: &[&str] = &["restock", "cash_collection", "maintenance"];
const ROLES: &[&str] = &["admin", "technician", "operator"];
const DIRECTIONS: &[&str] = &["in", "out"];

pub const MACHINE_FORM: FormSchema = FormSchema {
    fields: &[
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::required("location", FieldKind::Text),
        FieldSpec::optional("latitude", FieldKind::Float).check(latitude),
        FieldSpec::optional("longitude", FieldKind::Float).check(longitude),
        FieldSpec::optional("status", FieldKind::Choice(MACHINE_STATUSES)).or("active"),
        FieldSpec::required("toy_type", FieldKind::Text),
        FieldSpec::required("total_capacity", FieldKind::Integer).check(positive),
        FieldSpec::required("current_stock", FieldKind::Integer).check(non_negative),
    ],
};

pub const MACHINE_STATUS_FORM: FormSchema = FormSchema {
    fields: &[FieldSpec::required("status", FieldKind::Choice(MACHINE_STATUSES))],
};

pub const ORDER_FORM: FormSchema = FormSchema {
    fields: &[
        FieldSpec::optional("type", FieldKind::Choice(ORDER_TYPES)).or("restock"),
        FieldSpec::required("machine_id", FieldKind::Uuid),
        FieldSpec::optional("description", FieldKind::Text),
        FieldSpec::required("assignee_id", FieldKind::Uuid),
    ],
};

pub const ORDER_STATUS_FORM: FormSchema = FormSchema {
    fields: &[FieldSpec::required("status", FieldKind::Choice(ORDER_STATUSES))],
};

pub const STOCK_MOVEMENT_FORM: FormSchema = FormSchema {
    fields: &[
        FieldSpec::required("quantity", FieldKind::Integer).check(positive),
        FieldSpec::required("direction", FieldKind::Choice(DIRECTIONS)),
    ],
};

pub const CASH_COLLECTION_FORM: FormSchema = FormSchema {
    fields: &[FieldSpec::required("amount", FieldKind::Decimal).check(positive_amount)],
};

pub const SIGN_IN_FORM: FormSchema = FormSchema {
    fields: &[
        FieldSpec::required("email", FieldKind::Email),
        FieldSpec::required("password", FieldKind::Secret),
    ],
};

pub const SIGN_UP_FORM: FormSchema = FormSchema {
    fields: &[
        FieldSpec::required("email", FieldKind::Email),
        FieldSpec::required("password", FieldKind::Secret).check(password),
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::optional("role", FieldKind::Choice(ROLES)).or("operator"),
    ],
};

/// A new machine, with capacity and stock checked against each other.
pub fn machine_from(body: &Value) -> Result<NewMachine, FormError> {
    let machine: NewMachine = MACHINE_FORM.parse(body)?;
    if machine.current_stock > machine.total_capacity {
        return Err(FormError::Invalid {
            field: "current_stock",
            reason: format!("cannot exceed total_capacity ({})", machine.total_capacity),
        });
    }
    Ok(machine)
}

#[derive(Debug, Deserialize)]
struct StatusField<T> {
    status: T,
}

pub fn machine_status_from(body: &Value) -> Result<MachineStatus, FormError> {
    MACHINE_STATUS_FORM
        .parse::<StatusField<MachineStatus>>(body)
        .map(|f| f.status)
}

pub fn order_status_from(body: &Value) -> Result<OrderStatus, FormError> {
    ORDER_STATUS_FORM
        .parse::<StatusField<OrderStatus>>(body)
        .map(|f| f.status)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "type")]
    pub kind: OrderType,
    pub machine_id: Uuid,
    pub description: Option<String>,
    pub assignee_id: Uuid,
}

pub fn order_from(body: &Value) -> Result<OrderRequest, FormError> {
    ORDER_FORM.parse(body)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StockMovementRequest {
    pub quantity: i32,
    pub direction: Direction,
}

pub fn stock_movement_from(body: &Value) -> Result<StockMovementRequest, FormError> {
    STOCK_MOVEMENT_FORM.parse(body)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CashCollectionRequest {
    pub amount: Decimal,
}

pub fn cash_collection_from(body: &Value) -> Result<CashCollectionRequest, FormError> {
    CASH_COLLECTION_FORM.parse(body)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub fn sign_in_from(body: &Value) -> Result<SignInRequest, FormError> {
    SIGN_IN_FORM.parse(body)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

pub fn sign_up_from(body: &Value) -> Result<SignUpRequest, FormError> {
    SIGN_UP_FORM.parse(body)
}
