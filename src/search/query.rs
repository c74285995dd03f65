//! Search request shape and tantivy query construction

use serde::{Deserialize, Serialize};

/// Exact-match filters applied alongside the free-text query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// All listed tags must be present
    pub tags: Option<Vec<String>>,

    pub product: Option<String>,

    pub group: Option<String>,
}

/// A free-text search over the feature corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text, matched against title, description and step bodies.
    /// Empty means "everything matching the filters".
    pub query: String,

    pub filters: SearchFilters,

    pub limit: usize,

    pub offset: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: SearchFilters::default(),
            limit: 20,
            offset: 0,
        }
    }

    pub fn with_tags(mut self, tags: Vec<impl Into<String>>) -> Self {
        self.filters.tags = Some(tags.into_iter().map(|t| t.into()).collect());
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.filters.product = Some(product.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.filters.group = Some(group.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Builds tantivy queries from search requests
pub struct QueryBuilder {
    schema: tantivy::schema::Schema,
    index: tantivy::Index,
}

impl QueryBuilder {
    pub fn new(schema: tantivy::schema::Schema, index: tantivy::Index) -> Self {
        Self { schema, index }
    }

    /// Build a tantivy query: analyzed text match over title/description/body
    /// plus exact term filters for tags, product and group.
    pub fn build(
        &self,
        request: &SearchRequest,
    ) -> Result<Box<dyn tantivy::query::Query>, tantivy::query::QueryParserError> {
        use tantivy::query::*;

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if !request.query.trim().is_empty() {
            let mut text_fields = Vec::new();
            for name in ["title", "description", "body"] {
                if let Ok(field) = self.schema.get_field(name) {
                    text_fields.push(field);
                }
            }

            let query_parser = QueryParser::for_index(&self.index, text_fields);
            let parsed_query = query_parser.parse_query(&request.query)?;
            subqueries.push((Occur::Must, parsed_query));
        }

        if let Some(ref tags) = request.filters.tags {
            if let Ok(tags_field) = self.schema.get_field("tags") {
                for tag in tags {
                    subqueries.push((
                        Occur::Must,
                        Box::new(TermQuery::new(
                            tantivy::Term::from_field_text(tags_field, tag),
                            tantivy::schema::IndexRecordOption::Basic,
                        )),
                    ));
                }
            }
        }

        if let Some(ref product) = request.filters.product {
            if let Ok(product_field) = self.schema.get_field("product") {
                subqueries.push((
                    Occur::Must,
                    Box::new(TermQuery::new(
                        tantivy::Term::from_field_text(product_field, product),
                        tantivy::schema::IndexRecordOption::Basic,
                    )),
                ));
            }
        }

        if let Some(ref group) = request.filters.group {
            if let Ok(group_field) = self.schema.get_field("group") {
                subqueries.push((
                    Occur::Must,
                    Box::new(TermQuery::new(
                        tantivy::Term::from_field_text(group_field, group),
                        tantivy::schema::IndexRecordOption::Basic,
                    )),
                ));
            }
        }

        if subqueries.is_empty() {
            Ok(Box::new(AllQuery))
        } else if subqueries.len() == 1 {
            Ok(subqueries.into_iter().next().map(|(_, q)| q).unwrap_or_else(|| Box::new(AllQuery)))
        } else {
            Ok(Box::new(BooleanQuery::from(subqueries)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = SearchRequest::new("add item")
            .with_product("Webshop")
            .with_tags(vec!["smoke"])
            .with_limit(50)
            .with_offset(10);

        assert_eq!(request.query, "add item");
        assert_eq!(request.limit, 50);
        assert_eq!(request.offset, 10);
        assert_eq!(request.filters.product.as_deref(), Some("Webshop"));
        assert_eq!(request.filters.tags.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_filters_default() {
        let request = SearchRequest::new("");
        assert!(request.filters.tags.is_none());
        assert!(request.filters.product.is_none());
        assert!(request.filters.group.is_none());
    }
}
