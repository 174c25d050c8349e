//! Support types for generated Rust builders.
//!
//! Generated code imports this module (see `--rust-runtime-path`); nothing
//! in the generator itself depends on it.
use std::collections::BTreeMap;

/// Produces a finished model value. `build` never resets the builder and
/// each call returns an independent value.
pub trait Builder<T> {
    fn build(&self) -> Result<T, BuildError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{type_name}: required field `{field}` was never set")]
    MissingField { type_name: String, field: String },

    /// A value rejected by a constraint declared on the field.
    #[error("{type_name}: `{field}` {message}")]
    InvalidValue { type_name: String, field: String, message: String },

    #[error("{field}: {source}")]
    Nested {
        field: String,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    pub fn missing_field(type_name: &str, field: &str) -> Self {
        BuildError::MissingField { type_name: type_name.to_string(), field: field.to_string() }
    }

    pub fn invalid_value(type_name: &str, field: &str, message: &str) -> Self {
        BuildError::InvalidValue {
            type_name: type_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Attribute the error to the field it was raised for.
    pub fn in_field(self, field: impl Into<String>) -> Self {
        BuildError::Nested { field: field.into(), source: Box::new(self) }
    }
}

/// A field value given either directly or as a builder.
///
/// Conversions from builders call `build()` right away, so later changes
/// to the builder never reach a value that was already assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Nested<T>(Result<T, BuildError>);

impl<T> Nested<T> {
    pub fn from_builder<B: Builder<T> + ?Sized>(builder: &B) -> Self {
        Nested(builder.build())
    }

    pub fn into_result(self) -> Result<T, BuildError> {
        self.0
    }

    /// Unwrap the value, attributing a failure to `field`.
    pub fn resolve(self, field: &str) -> Result<T, BuildError> {
        self.0.map_err(|error| error.in_field(field))
    }
}

/// Resolve a sequence of values or builders in input order.
pub fn resolve_list<T, I, V>(field: &str, items: I) -> Result<Vec<T>, BuildError>
where
    I: IntoIterator<Item = V>,
    V: Into<Nested<T>>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| Into::<Nested<T>>::into(item).resolve(&format!("{field}[{index}]")))
        .collect()
}

pub fn resolve_map<T, I, K, V>(field: &str, entries: I) -> Result<BTreeMap<String, T>, BuildError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Nested<T>>,
{
    entries
        .into_iter()
        .map(|(key, item)| {
            let key = key.into();
            let value = Into::<Nested<T>>::into(item).resolve(&format!("{field}.{key}"))?;
            Ok((key, value))
        })
        .collect()
}

impl<T> From<T> for Nested<T> {
    fn from(value: T) -> Self {
        Nested(Ok(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
    }

    struct CountingBuilder {
        x: i32,
        calls: Cell<u32>,
    }

    impl Builder<Point> for CountingBuilder {
        fn build(&self) -> Result<Point, BuildError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Point { x: self.x })
        }
    }

    #[test]
    fn builders_are_resolved_once_at_conversion() {
        let mut builder = CountingBuilder { x: 1, calls: Cell::new(0) };
        let nested = Nested::from_builder(&builder);
        assert_eq!(builder.calls.get(), 1);
        builder.x = 2;
        assert_eq!(nested.into_result(), Ok(Point { x: 1 }));
        assert_eq!(builder.calls.get(), 1);
    }

    #[test]
    fn plain_values_pass_through() {
        let nested: Nested<Point> = Point { x: 3 }.into();
        assert_eq!(nested.into_result(), Ok(Point { x: 3 }));
    }

    #[test]
    fn list_items_resolve_in_order_and_report_their_index() {
        let items: Vec<Nested<Point>> = vec![
            Point { x: 1 }.into(),
            Nested(Err(BuildError::missing_field("Point", "x"))),
        ];
        let err = resolve_list::<Point, _, _>("points", items).unwrap_err();
        assert_eq!(err.to_string(), "points[1]: Point: required field `x` was never set");

        let ok: Vec<Point> = resolve_list("points", [Point { x: 1 }, Point { x: 2 }]).unwrap();
        assert_eq!(ok, vec![Point { x: 1 }, Point { x: 2 }]);
    }

    #[test]
    fn map_entries_are_keyed_by_string() {
        let resolved: BTreeMap<String, Point> = resolve_map("byName", [("a", Point { x: 1 })]).unwrap();
        assert_eq!(resolved.get("a"), Some(&Point { x: 1 }));
    }

    #[test]
    fn nested_errors_keep_the_field_path() {
        let err = BuildError::missing_field("DashboardLink", "url").in_field("links[1]");
        assert_eq!(err.to_string(), "links[1]: DashboardLink: required field `url` was never set");
    }

    #[test]
    fn rejected_values_name_the_constraint() {
        let err = BuildError::invalid_value("DashboardLink", "title", "must have length >= 1").in_field("links[0]");
        assert_eq!(err.to_string(), "links[0]: DashboardLink: `title` must have length >= 1");
    }
}
