use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub mod table;

pub use table::TableError;

/// Column holding the postcode a listing was found under
pub const POSTCODE_COLUMN: &str = "postcode";

/// Column holding the raw listing description
pub const TEXT_COLUMN: &str = "text";

/// A single extracted cell value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Structured fields read from a search result card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    Price,
    PropertyType,
    Bedrooms,
    Bathrooms,
}

impl ListingField {
    pub const ALL: [Self; 4] = [
        Self::Price,
        Self::PropertyType,
        Self::Bedrooms,
        Self::Bathrooms,
    ];

    /// Column name of this field in the output table
    pub fn column(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::PropertyType => "property_type",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
        }
    }
}

/// Which fields and description keywords to collect for each listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub price: bool,
    pub property_type: bool,
    pub bedrooms: bool,
    pub bathrooms: bool,
    pub text: bool,
    /// Phrases searched for in the description, keyed by phrase
    pub text_values: BTreeMap<String, bool>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            price: true,
            property_type: true,
            bedrooms: true,
            bathrooms: true,
            text: true,
            text_values: BTreeMap::from([
                ("fully furnished".to_string(), true),
                ("parking space".to_string(), true),
            ]),
        }
    }
}

impl FieldSpec {
    pub fn wants(&self, field: ListingField) -> bool {
        match field {
            ListingField::Price => self.price,
            ListingField::PropertyType => self.property_type,
            ListingField::Bedrooms => self.bedrooms,
            ListingField::Bathrooms => self.bathrooms,
        }
    }

    /// Keywords flagged for scanning
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.text_values
            .iter()
            .filter(|(_, wanted)| **wanted)
            .map(|(keyword, _)| keyword.as_str())
    }

    /// Output columns: postcode, wanted fields, wanted keywords, then the raw text.
    ///
    /// Keyword columns only exist when the description itself is collected.
    pub fn schema(&self) -> Schema {
        let mut columns = vec![Column::new(POSTCODE_COLUMN, ColumnKind::Postcode)];
        for field in ListingField::ALL {
            if self.wants(field) {
                columns.push(Column::new(field.column(), ColumnKind::Field));
            }
        }
        if self.text {
            for keyword in self.keywords() {
                columns.push(Column::new(keyword, ColumnKind::Keyword));
            }
            columns.push(Column::new(TEXT_COLUMN, ColumnKind::Text));
        }
        Schema::new(columns)
    }
}

/// How a column's cells are typed when read back from a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Postcode,
    /// Formatted listing field: integer when it parses, text otherwise
    Field,
    /// Keyword hit flag
    Keyword,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column layout of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// One scraped listing, keyed by column name. A missing value is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ListingRow(BTreeMap<String, Option<FieldValue>>);

impl ListingRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: Option<FieldValue>) {
        self.0.insert(column.into(), value);
    }

    /// Builder form of [`ListingRow::set`]
    pub fn with(mut self, column: impl Into<String>, value: Option<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.0.get(column).and_then(Option::as_ref)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn postcode(&self) -> Option<&str> {
        match self.get(POSTCODE_COLUMN) {
            Some(FieldValue::Text(pc)) => Some(pc),
            _ => None,
        }
    }

    pub fn tag_postcode(&mut self, postcode: &str) {
        self.set(POSTCODE_COLUMN, Some(FieldValue::Text(postcode.to_string())));
    }

    /// True when every column other than the postcode is null
    pub fn is_blank(&self) -> bool {
        self.0
            .iter()
            .filter(|(column, _)| column.as_str() != POSTCODE_COLUMN)
            .all(|(_, value)| value.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Restrict the row to `schema`, filling absent columns with null
    fn conform(mut self, schema: &Schema) -> Self {
        self.0.retain(|column, _| schema.contains(column));
        for name in schema.names() {
            self.0.entry(name.to_string()).or_insert(None);
        }
        self
    }
}

/// Rows collected under one schema, in insertion order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<ListingRow>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(schema: Schema, rows: impl IntoIterator<Item = ListingRow>) -> Self {
        let mut dataset = Self::new(schema);
        dataset.extend(rows);
        dataset
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[ListingRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ListingRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: ListingRow) {
        let row = row.conform(&self.schema);
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = ListingRow>) {
        for row in rows {
            self.push(row);
        }
    }

    /// Distinct postcodes in first-seen order
    pub fn postcodes(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for pc in self.rows.iter().filter_map(ListingRow::postcode) {
            if !seen.contains(&pc) {
                seen.push(pc);
            }
        }
        seen
    }
}

/// A postcode picked for scraping and the region it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostcodeRecord {
    pub postcode: String,
    pub region: String,
}

impl PostcodeRecord {
    pub fn new(postcode: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            postcode: postcode.into(),
            region: region.into(),
        }
    }
}

/// Postcodes of one region, in draw order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionGroup<'a> {
    pub region: &'a str,
    pub postcodes: Vec<&'a str>,
}

/// The postcodes a run will crawl
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostcodeSample {
    records: Vec<PostcodeRecord>,
}

impl PostcodeSample {
    pub fn from_records(records: Vec<PostcodeRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PostcodeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records grouped by region, regions in first-encountered order
    pub fn regions(&self) -> Vec<RegionGroup<'_>> {
        let mut groups: Vec<RegionGroup<'_>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            let slot = *index.entry(record.region.as_str()).or_insert_with(|| {
                groups.push(RegionGroup {
                    region: &record.region,
                    postcodes: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].postcodes.push(&record.postcode);
        }
        groups
    }

    pub fn count_in(&self, region: &str) -> usize {
        self.records.iter().filter(|r| r.region == region).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_layout() {
        let schema = FieldSpec::default().schema();
        let names: Vec<_> = schema.names().collect();
        assert_eq!(
            names,
            vec![
                "postcode",
                "price",
                "property_type",
                "bedrooms",
                "bathrooms",
                "fully furnished",
                "parking space",
                "text"
            ]
        );
    }

    #[test]
    fn test_schema_drops_keywords_without_text() {
        let spec = FieldSpec {
            text: false,
            bathrooms: false,
            ..FieldSpec::default()
        };
        let names: Vec<_> = spec.schema().names().map(str::to_string).collect();
        assert_eq!(names, vec!["postcode", "price", "property_type", "bedrooms"]);
    }

    #[test]
    fn test_unwanted_keyword_is_not_a_column() {
        let mut spec = FieldSpec::default();
        spec.text_values.insert("garden".to_string(), false);
        assert!(!spec.schema().contains("garden"));
    }

    #[test]
    fn test_dataset_conforms_rows_to_schema() {
        let schema = Schema::new(vec![
            Column::new(POSTCODE_COLUMN, ColumnKind::Postcode),
            Column::new("price", ColumnKind::Field),
        ]);
        let mut dataset = Dataset::new(schema);
        dataset.push(
            ListingRow::new()
                .with("postcode", Some("AB1 2CD".into()))
                .with("stray", Some(FieldValue::Int(1))),
        );

        let row = &dataset.rows()[0];
        assert!(row.contains("price"));
        assert!(!row.contains("stray"));
        assert!(row.is_blank());
    }

    #[test]
    fn test_sample_groups_regions_in_first_seen_order() {
        let sample = PostcodeSample::from_records(vec![
            PostcodeRecord::new("N1", "London"),
            PostcodeRecord::new("M1", "North West"),
            PostcodeRecord::new("E1", "London"),
        ]);
        let groups = sample.regions();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].region, "London");
        assert_eq!(groups[0].postcodes, vec!["N1", "E1"]);
        assert_eq!(groups[1].postcodes, vec!["M1"]);
    }

    #[test]
    fn test_postcodes_are_distinct_in_order() {
        let schema = FieldSpec::default().schema();
        let rows = ["B", "A", "B"]
            .iter()
            .map(|pc| ListingRow::new().with(POSTCODE_COLUMN, Some((*pc).into())));
        let dataset = Dataset::with_rows(schema, rows);
        assert_eq!(dataset.postcodes(), vec!["B", "A"]);
    }
}
