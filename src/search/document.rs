//! Search document structure and schema

use crate::models::FeatureDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Flattened projection of one feature for the search index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSearchDoc {
    /// Derived feature identifier, the index upsert key
    pub id: String,

    pub branch: String,
    pub group: String,
    pub title: String,
    pub description: String,

    /// Scenario names, step lines and background steps, concatenated.
    /// Analyzed for full-text matching and stored verbatim so the scenario
    /// text can be read back from the projection.
    pub body: String,

    pub tags: Vec<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub upload_date: DateTime<Utc>,
}

impl From<&FeatureDocument> for FeatureSearchDoc {
    fn from(feature: &FeatureDocument) -> Self {
        let mut body_parts: Vec<&str> = Vec::new();
        if let Some(ref background) = feature.background {
            body_parts.extend(background.steps.iter().map(String::as_str));
        }
        for scenario in &feature.scenarios {
            body_parts.push(scenario.name.as_str());
            body_parts.extend(scenario.steps.iter().map(String::as_str));
        }

        Self {
            id: feature.id.clone(),
            branch: feature.branch.clone(),
            group: feature.group.clone(),
            title: feature.title.clone(),
            description: feature.description.clone(),
            body: body_parts.join("\n"),
            tags: feature.tags.clone(),
            product: feature.product.clone(),
            version: feature.version.clone(),
            upload_date: feature.upload_date,
        }
    }
}

impl FeatureSearchDoc {
    /// Convert to a tantivy document under the given schema
    pub fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        if let Ok(field) = schema.get_field("id") {
            doc.add_text(field, &self.id);
        }
        if let Ok(field) = schema.get_field("branch") {
            doc.add_text(field, &self.branch);
        }
        if let Ok(field) = schema.get_field("group") {
            doc.add_text(field, &self.group);
        }
        if let Ok(field) = schema.get_field("title") {
            doc.add_text(field, &self.title);
        }
        if let Ok(field) = schema.get_field("description") {
            doc.add_text(field, &self.description);
        }
        if let Ok(field) = schema.get_field("body") {
            doc.add_text(field, &self.body);
        }
        if let Ok(field) = schema.get_field("tags") {
            for tag in &self.tags {
                doc.add_text(field, tag);
            }
        }
        if let Some(ref product) = self.product {
            if let Ok(field) = schema.get_field("product") {
                doc.add_text(field, product);
            }
        }
        if let Some(ref version) = self.version {
            if let Ok(field) = schema.get_field("version") {
                doc.add_text(field, version);
            }
        }
        if let Ok(field) = schema.get_field("upload_date") {
            doc.add_date(
                field,
                tantivy::DateTime::from_timestamp_secs(self.upload_date.timestamp()),
            );
        }

        doc
    }
}

/// Build the search schema for feature documents
///
/// Description, title and step bodies go through the default tokenizer (the
/// text-analysis hook point); everything else is indexed raw for exact
/// filtering and stored for hit assembly.
pub fn build_feature_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Identifier - raw indexed for upsert/delete by term, stored
    schema_builder.add_text_field("id", STRING | STORED);

    // Coordinates - raw indexed for exact filters, stored for display
    schema_builder.add_text_field("branch", STRING | STORED);
    schema_builder.add_text_field("group", STRING | STORED);

    // Analyzed text
    schema_builder.add_text_field("title", TEXT | STORED);
    schema_builder.add_text_field("description", TEXT | STORED);
    schema_builder.add_text_field("body", TEXT | STORED);

    // Tags - multi-valued, raw indexed
    schema_builder.add_text_field("tags", STRING | STORED);

    // Classification metadata
    schema_builder.add_text_field("product", STRING | STORED);
    schema_builder.add_text_field("version", STRING | STORED);

    // Upload timestamp
    schema_builder.add_date_field("upload_date", INDEXED | STORED | FAST);

    schema_builder.build()
}
