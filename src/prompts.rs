//! Prompts for the extraction and validation model calls.
//!
//! Both prompts live here so a wording change never touches parsing or
//! error-handling code, and so tests can inspect the exact text sent.

use crate::schema::{schema_template, ExtractedRecord};

/// Instructions for the vision model. The blank schema is appended by
/// [`extraction_prompt`].
pub const EXTRACTION_INSTRUCTIONS: &str = r#"You are an expert at reading invoice images and extracting details from them. You are given one or more images of a single invoice. Extract the information below and populate the JSON schema at the end exactly, using the same keys.

Invoice information:
- InvoiceNumber: the order number or invoice number printed on the invoice. If not given, fill "NA".
- InvoiceDate: the invoice date printed on the invoice.
- ProductDescription: the description / product id of the tires purchased, exactly as printed. Ignore services.
- Quantity: if the quantity is not printed for a product, compute it by dividing the product's total amount by its unit price.

Customer information:
- FirstName: first name of the customer or advisor who purchased the product.
- LastName: last name of the customer or advisor who purchased the product.
- Address: the customer's address, only if it appears below the customer name; otherwise "NA".

Store information (on Tire Rack invoices the store information is printed at the top left):
- StoreName: the store the product was purchased from. If not on the invoice, fill "NA". Never use the shipping address name.
- Address: the store's address, usually printed below the store information; otherwise "NA".

If a date is partly printed and partly handwritten (for example "20.." completed with "25"), combine both parts into the full date (2025).
Store information always comes before customer information. Billing and shipping information belong to the customer.

STRICT RULES:
- Do not invent values. Fill a field only if it appears on the invoice.
- If there is more than one ProductDescription, add one Product entry per product. If there is only one, return only one.
- Respond ONLY with valid JSON (no extra text).

Example of a filled schema:
{
  "Invoice": {
    "InvoiceData": {
      "InvoiceNumber": "abc123",
      "InvoiceDate": "05-06-2025"
    },
    "Product": [
      {
        "ProductDescription": "A245/456 HK DYNPRO HTRH12*# 111222 113T",
        "Quantity": "4"
      }
    ],
    "CustomerInformation": {
      "FirstName": "John",
      "LastName": "Adams",
      "Address": "5919 Main St, Springfield, IL 62704-6215"
    },
    "StoreInformation": {
      "StoreName": "Tire Rack",
      "Address": "710 Kendall St, South Bend, IN 46601-8222"
    }
  }
}

Respond ONLY with valid JSON (no extra text).

Schema:
"#;

/// Full extraction prompt: instructions followed by the blank schema.
pub fn extraction_prompt() -> String {
    let schema = serde_json::to_string_pretty(&schema_template())
        .unwrap_or_else(|_| String::from("{}"));
    format!("{EXTRACTION_INSTRUCTIONS}{schema}")
}

/// Validation prompt combining the rules document and the extracted record.
pub fn validation_prompt(rules: &str, record: &ExtractedRecord, expected_quantity: u32) -> String {
    format!(
        "You are an expert validator for invoice extraction. You are given:\n\
1) Eligible products, date ranges, and expected quantity rules in plain text.\n\
2) The extracted invoice data as JSON.\n\n\
Read the rules carefully and check:\n\
1. Product description: if it matches any eligible product, return \"True\", otherwise \"False\". \
The eligible product name may appear in the middle or at the end of the product description.\n\
2. Purchase date: if it falls within the given promotion date range, return \"True\", otherwise \"False\".\n\
3. Quantity: the expected value is {expected_quantity}. If it is exactly {expected_quantity}, return \"True\", otherwise \"False\".\n\n\
Respond ONLY with a JSON object in exactly this format (no extra keys or text):\n\
{{\n  \"Product description\": \"True\" or \"False\",\n  \"purchase_date\": \"True\" or \"False\",\n  \"quantity\": \"True\" or \"False\"\n}}\n\n\
Rules:\n{rules}\n\n\
Extracted Data:\n{record}\n",
        rules = rules.trim(),
        record = record.to_pretty_json(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extraction_prompt_ends_with_schema() {
        let p = extraction_prompt();
        let schema = p.rsplit("Schema:\n").next().unwrap();
        let v: serde_json::Value = serde_json::from_str(schema).expect("schema is JSON");
        assert!(v["Invoice"]["Product"].is_array());
        assert!(p.contains("Respond ONLY with valid JSON"));
    }

    #[test]
    fn validation_prompt_embeds_rules_record_and_quantity() {
        let record = ExtractedRecord(json!({"Invoice": {"InvoiceData": {"InvoiceNumber": "X-77"}}}));
        let p = validation_prompt("  eligible product: DYNPRO HTRH12\n", &record, 4);
        assert!(p.contains("Rules:\neligible product: DYNPRO HTRH12\n"));
        assert!(p.contains("\"InvoiceNumber\": \"X-77\""));
        assert!(p.contains("expected value is 4"));
        assert!(p.contains("\"purchase_date\""));
    }
}
