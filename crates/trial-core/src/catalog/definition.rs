use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::Value;

use crate::errors::TrialError;
use crate::model::{StepCode, StepPayload};

/// Tipo declarado de un campo de formulario. Determina cómo se valida y cómo
/// se imprime en el reporte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Textarea,
    Checkbox,
    Date,
    Time,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Time => "time",
        }
    }
}

/// Definición de un campo dentro de un step del catálogo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

impl FieldDefinition {
    /// Valida un valor presente en el payload. `None` = campo ausente.
    fn check(&self, value: Option<&Value>) -> Result<(), String> {
        let value = match value {
            None | Some(Value::Null) => return self.missing(),
            Some(Value::String(s)) if s.trim().is_empty() => return self.missing(),
            Some(v) => v,
        };
        let ok = match self.field_type {
            FieldType::Text | FieldType::Textarea => value.is_string() || value.is_number(),
            FieldType::Number => match value {
                Value::Number(_) => true,
                Value::String(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            },
            FieldType::Select => value.as_str().map(|s| self.options.contains(&s)).unwrap_or(false),
            FieldType::Checkbox => value.is_boolean(),
            FieldType::Date => value.as_str()
                                    .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok())
                                    .unwrap_or(false),
            FieldType::Time => value.as_str()
                                    .map(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").is_ok())
                                    .unwrap_or(false),
        };
        if ok {
            Ok(())
        } else if self.field_type == FieldType::Select {
            Err(format!("{} must be one of [{}]", self.label, self.options.join(", ")))
        } else {
            Err(format!("{} is not a valid {} value", self.label, self.field_type.as_str()))
        }
    }

    fn missing(&self) -> Result<(), String> {
        // Un checkbox ausente equivale a "No", nunca falta.
        if self.required && self.field_type != FieldType::Checkbox {
            Err(format!("{} is required", self.label))
        } else {
            Ok(())
        }
    }
}

/// Entrada del catálogo de workflow: un departamento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub code: StepCode,
    pub name: &'static str,
    pub order_index: usize,
    pub fields: &'static [FieldDefinition],
}

impl StepDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Valida el payload contra los campos declarados. Reporta todos los
    /// problemas juntos; los campos no declarados se ignoran.
    pub fn validate_payload(&self, payload: &StepPayload) -> Result<(), TrialError> {
        let problems: Vec<String> = self.fields
                                        .iter()
                                        .filter_map(|f| f.check(payload.get(f.name)).err())
                                        .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(TrialError::Validation(format!("{}: {}", self.code, problems.join("; "))))
        }
    }
}
