//! The extraction schema, the extracted record and the validation verdict.
//!
//! The extraction model is asked to fill a fixed nested JSON structure. What
//! comes back is kept as raw JSON ([`ExtractedRecord`]) because the model is
//! free to add, drop, or rename keys and the record is passed verbatim to the
//! validator and the HTTP response. The typed structs below are a lenient
//! view over that JSON and the source of the schema literal in the prompt.

use crate::error::InvoiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level wrapper: `{"Invoice": { … }}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    #[serde(rename = "Invoice", default)]
    pub invoice: Invoice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "InvoiceData", default)]
    pub invoice_data: InvoiceData,

    #[serde(rename = "Product", default)]
    pub products: Vec<Product>,

    #[serde(rename = "CustomerInformation", default)]
    pub customer: CustomerInformation,

    #[serde(rename = "StoreInformation", default)]
    pub store: StoreInformation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InvoiceData {
    pub invoice_number: String,
    pub invoice_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Product {
    pub product_description: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CustomerInformation {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StoreInformation {
    pub store_name: String,
    pub address: String,
}

/// The blank schema embedded in the extraction prompt.
///
/// Two empty `Product` entries hint that the list may hold several items.
pub fn schema_template() -> InvoiceDocument {
    InvoiceDocument {
        invoice: Invoice {
            products: vec![Product::default(), Product::default()],
            ..Invoice::default()
        },
    }
}

/// A populated instance of the schema, exactly as the model returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord(pub Value);

impl ExtractedRecord {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Lenient typed view. Missing keys become empty strings; `None` only
    /// when the JSON shape cannot be read at all (e.g. `Product` is a string).
    pub fn invoice(&self) -> Option<InvoiceDocument> {
        serde_json::from_value(self.0.clone()).ok()
    }

    /// Pretty-printed JSON, as embedded in the validation prompt.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

/// Key names of the three verdict fields, in prompt order.
pub const VERDICT_KEYS: [&str; 3] = ["Product description", "purchase_date", "quantity"];

/// The validator's three-key answer.
///
/// Values are kept verbatim: usually `"True"`/`"False"`, sometimes an
/// extended string such as `"matched with 90%"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "Product description")]
    pub product_description: String,
    #[serde(rename = "purchase_date")]
    pub purchase_date: String,
    #[serde(rename = "quantity")]
    pub quantity: String,
}

impl Verdict {
    /// Normalise a parsed validator response.
    ///
    /// Every key in [`VERDICT_KEYS`] must be present; extra keys are dropped.
    pub fn from_json(result: &Value) -> Result<Self, InvoiceError> {
        let field = |key: &str| -> Result<String, InvoiceError> {
            result
                .get(key)
                .map(verdict_value)
                .ok_or_else(|| InvoiceError::MissingVerdictKey {
                    key: key.to_string(),
                    raw: result.to_string(),
                })
        };

        Ok(Self {
            product_description: field(VERDICT_KEYS[0])?,
            purchase_date: field(VERDICT_KEYS[1])?,
            quantity: field(VERDICT_KEYS[2])?,
        })
    }

    /// True when all three checks answered exactly "True".
    pub fn is_eligible(&self) -> bool {
        [&self.product_description, &self.purchase_date, &self.quantity]
            .iter()
            .all(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Render a JSON value the way the verdict expects: booleans as
/// "True"/"False", strings unquoted, everything trimmed.
fn verdict_value(v: &Value) -> String {
    match v {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
