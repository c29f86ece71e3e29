//! `azurerm_automation_variable_*` data sources.
//!
//! ARM stores every variable value as a JSON document in a string: `true`,
//! `42`, `"text"`, or `"\/Date(1563843600000)\/"` for datetimes. Each data
//! source variant decodes it into its own type.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::models::AutomationVariable;
use crate::client::Clients;
use crate::context::OperationContext;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema, StringValidation};
use crate::services::lifecycle::{self, require_non_empty};

/// Value type of an Automation variable data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Bool,
    Int,
    String,
    Datetime,
}

impl VariableKind {
    pub const ALL: [VariableKind; 4] = [Self::Bool, Self::Int, Self::String, Self::Datetime];

    /// Host type name of the data source for this kind.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "azurerm_automation_variable_bool",
            Self::Int => "azurerm_automation_variable_int",
            Self::String => "azurerm_automation_variable_string",
            Self::Datetime => "azurerm_automation_variable_datetime",
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == type_name)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::String => "String",
            Self::Datetime => "Datetime",
        }
    }

    fn value_type(self) -> AttributeType {
        match self {
            Self::Bool => AttributeType::Bool,
            Self::Int => AttributeType::Int64,
            Self::String | Self::Datetime => AttributeType::String,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutomationVariableLookup {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationVariableState {
    pub id: String,
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    pub description: String,
    pub encrypted: bool,
    pub value: Value,
}

pub fn data_source_schema(kind: VariableKind) -> Schema {
    let required = || Attribute::required_string().with_validation(StringValidation::NotEmpty);
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", required())
        .with_attribute("resource_group_name", required())
        .with_attribute("automation_account_name", required())
        .with_attribute("description", Attribute::computed_string())
        .with_attribute("encrypted", Attribute::computed_bool())
        .with_attribute(
            "value",
            Attribute::new(kind.value_type(), AttributeFlags::computed()),
        )
}

/// Decode the JSON-encoded `value` of a variable.
///
/// `None` (an encrypted variable) decodes to null.
pub fn parse_value(kind: VariableKind, raw: Option<&str>) -> Result<Value, ProviderError> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };
    let mismatch = || {
        ProviderError::Configuration(format!(
            "Automation variable value {:?} is not of type {}",
            raw,
            kind.label()
        ))
    };

    let decoded: Value = serde_json::from_str(raw).map_err(|_| mismatch())?;
    match (kind, &decoded) {
        (VariableKind::Bool, Value::Bool(_)) => Ok(decoded),
        (VariableKind::Int, Value::Number(n)) if n.is_i64() => Ok(decoded),
        (VariableKind::String, Value::String(_)) => Ok(decoded),
        (VariableKind::Datetime, Value::String(s)) => {
            parse_datetime(s).map(Value::String).ok_or_else(mismatch)
        },
        _ => Err(mismatch()),
    }
}

/// `/Date(<millis>)/` to RFC 3339.
fn parse_datetime(value: &str) -> Option<String> {
    let millis = value.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let millis: i64 = millis.parse().ok()?;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn flatten(
    kind: VariableKind,
    variable: AutomationVariable,
    lookup: &AutomationVariableLookup,
) -> Result<AutomationVariableState, ProviderError> {
    let props = variable.properties.unwrap_or_default();
    Ok(AutomationVariableState {
        id: variable.id.unwrap_or_default(),
        name: variable.name.unwrap_or_else(|| lookup.name.clone()),
        resource_group_name: lookup.resource_group_name.clone(),
        automation_account_name: lookup.automation_account_name.clone(),
        description: props.description.unwrap_or_default(),
        encrypted: props.is_encrypted.unwrap_or_default(),
        value: parse_value(kind, props.value.as_deref())?,
    })
}

#[instrument(skip(clients, ctx, lookup), fields(resource_group = %lookup.resource_group_name, name = %lookup.name))]
pub async fn read_data_source(
    clients: &Clients,
    ctx: &OperationContext,
    kind: VariableKind,
    lookup: &AutomationVariableLookup,
) -> Result<AutomationVariableState, ProviderError> {
    require_non_empty("name", &lookup.name)?;
    require_non_empty("resource_group_name", &lookup.resource_group_name)?;
    require_non_empty("automation_account_name", &lookup.automation_account_name)?;

    let what = format!(
        "Automation {} Variable {:?} (Automation Account Name {:?} / Resource Group {:?})",
        kind.label(),
        lookup.name,
        lookup.automation_account_name,
        lookup.resource_group_name
    );
    debug!(kind = kind.label(), "reading automation variable");
    let variable = lifecycle::lookup(
        ctx,
        &what,
        clients.automation_variables.get(
            &lookup.resource_group_name,
            &lookup.automation_account_name,
            &lookup.name,
        ),
    )
    .await?;

    flatten(kind, variable, lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_per_kind() {
        assert_eq!(parse_value(VariableKind::Bool, Some("true")).unwrap(), json!(true));
        assert_eq!(parse_value(VariableKind::Int, Some("42")).unwrap(), json!(42));
        assert_eq!(
            parse_value(VariableKind::String, Some("\"Hello, world!\"")).unwrap(),
            json!("Hello, world!")
        );
        assert_eq!(
            parse_value(VariableKind::Datetime, Some("\"\\/Date(1556142054074)\\/\"")).unwrap(),
            json!("2019-04-24T21:40:54.074Z")
        );
    }

    #[test]
    fn test_parse_value_absent_is_null() {
        for kind in VariableKind::ALL {
            assert_eq!(parse_value(kind, None).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_parse_value_wrong_type() {
        let cases = [
            (VariableKind::Bool, "\"true\""),
            (VariableKind::Int, "4.5"),
            (VariableKind::String, "7"),
            (VariableKind::Datetime, "\"yesterday\""),
            (VariableKind::Bool, "not json"),
        ];
        for (kind, raw) in cases {
            let err = parse_value(kind, Some(raw)).unwrap_err();
            assert!(matches!(err, ProviderError::Configuration(_)), "{:?} {}", kind, raw);
        }
    }

    #[test]
    fn test_type_names() {
        for kind in VariableKind::ALL {
            assert_eq!(VariableKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(VariableKind::from_type_name("azurerm_automation_variable"), None);
        assert_eq!(
            data_source_schema(VariableKind::Int).block.attributes["value"].attr_type,
            AttributeType::Int64
        );
    }
}
