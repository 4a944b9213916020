//! Display order of document fields.

/// Field names checked, in order, when picking a document's display name.
pub const NAME_FIELD_CANDIDATES: [&str; 4] = ["name", "title", "label", "id"];

/// Field ordering for a document listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    primary_key: String,
    name_field: String,
    fields: Vec<String>,
}

impl FieldLayout {
    /// Builds the layout from the index fields and its primary key.
    #[must_use]
    pub fn new<I, S>(fields: I, primary_key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary_key = primary_key.into();
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let name_field = NAME_FIELD_CANDIDATES
            .iter()
            .find(|candidate| fields.iter().any(|f| f == *candidate))
            .map_or_else(|| primary_key.clone(), ToString::to_string);

        Self {
            primary_key,
            name_field,
            fields,
        }
    }

    /// Primary key.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Field used as a document's title.
    #[must_use]
    pub fn name_field(&self) -> &str {
        &self.name_field
    }

    /// Primary key, then name field, then the rest in their original order.
    #[must_use]
    pub fn sorted_fields(&self) -> Vec<&str> {
        let mut sorted = vec![self.primary_key.as_str()];
        if self.name_field != self.primary_key {
            sorted.push(self.name_field.as_str());
        }
        sorted.extend(
            self.fields
                .iter()
                .map(String::as_str)
                .filter(|f| *f != self.primary_key && *f != self.name_field),
        );
        sorted
    }

    /// Every field except the primary key, in original order.
    #[must_use]
    pub fn fields_without_primary_key(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(String::as_str)
            .filter(|f| *f != self.primary_key)
            .collect()
    }
}
