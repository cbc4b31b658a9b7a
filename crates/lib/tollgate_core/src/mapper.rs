//! Structural object mapper with per-pair override rules.
//!
//! A *shape* is any type that serializes to a JSON object. The default
//! conversion copies every destination field from a same-named source field
//! when the value is assignable, i.e. the destination still deserializes with
//! it. Fields without such a counterpart keep the value they already had.
//!
//! Destination field names come from the type's `Deserialize` impl, so fields
//! that are skipped on serialization (`skip_serializing_if`) are still mapped.
//!
//! Rules registered for an exact `(source, destination)` pair replace the
//! default conversion entirely. Rules are registered on a [`MapperBuilder`]
//! during startup; the built [`Mapper`] is immutable.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use serde::Serialize;
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Mapping failures.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("invalid destination: {0} is not a struct-like shape")]
    InvalidDestination(&'static str),

    #[error("invalid source: {0} is not a struct-like shape")]
    InvalidSource(&'static str),

    #[error("{to}.{field} has no assignable counterpart in {from}")]
    MissingField {
        from: &'static str,
        to: &'static str,
        field: String,
    },

    #[error("rule {from} -> {to} failed: {reason}")]
    Rule {
        from: &'static str,
        to: &'static str,
        reason: String,
    },

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MappingError {
    /// Helper for rule bodies that need to reject a value.
    pub fn rule<S: ?Sized, D: ?Sized>(reason: impl Into<String>) -> Self {
        Self::Rule {
            from: type_name::<S>(),
            to: type_name::<D>(),
            reason: reason.into(),
        }
    }
}

type RuleFn = dyn Fn(&dyn Any, &mut dyn Any) -> Result<(), MappingError> + Send + Sync;

struct Rule {
    from: &'static str,
    to: &'static str,
    apply: Box<RuleFn>,
}

/// Whether destination fields may be left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coverage {
    Partial,
    Full,
}

/// Collects mapping rules before the mapper is frozen.
#[derive(Default)]
pub struct MapperBuilder {
    rules: HashMap<(TypeId, TypeId), Rule>,
}

impl MapperBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override for the `S -> D` pair. A second registration for
    /// the same pair replaces the first.
    pub fn rule<S, D, F>(mut self, rule: F) -> Self
    where
        S: 'static,
        D: 'static,
        F: Fn(&S, &mut D) -> Result<(), MappingError> + Send + Sync + 'static,
    {
        let from = type_name::<S>();
        let to = type_name::<D>();
        let apply = move |source: &dyn Any, destination: &mut dyn Any| {
            match (source.downcast_ref::<S>(), destination.downcast_mut::<D>()) {
                (Some(source), Some(destination)) => rule(source, destination),
                _ => Err(MappingError::Rule {
                    from,
                    to,
                    reason: "shape mismatch".into(),
                }),
            }
        };

        let replaced = self.rules.insert(
            (TypeId::of::<S>(), TypeId::of::<D>()),
            Rule {
                from,
                to,
                apply: Box::new(apply),
            },
        );
        if replaced.is_some() {
            warn!(from, to, "mapping rule registered twice, keeping the latest");
        }
        self
    }

    pub fn build(self) -> Mapper {
        debug!(rules = self.rules.len(), "mapper ready");
        Mapper { rules: self.rules }
    }
}

/// Immutable mapper shared by every request.
pub struct Mapper {
    rules: HashMap<(TypeId, TypeId), Rule>,
}

impl Mapper {
    pub fn builder() -> MapperBuilder {
        MapperBuilder::new()
    }

    /// Populate `destination` from `source`.
    ///
    /// A registered rule for the exact pair owns the conversion. Otherwise
    /// fields are copied by name; unmatched destination fields are left as is.
    pub fn map<S, D>(&self, source: &S, destination: &mut D) -> Result<(), MappingError>
    where
        S: Serialize + 'static,
        D: Serialize + DeserializeOwned + 'static,
    {
        self.map_with(source, destination, Coverage::Partial)
    }

    /// Like [`Mapper::map`], but every destination field must be populated
    /// from the source when no rule is registered.
    pub fn map_strict<S, D>(&self, source: &S, destination: &mut D) -> Result<(), MappingError>
    where
        S: Serialize + 'static,
        D: Serialize + DeserializeOwned + 'static,
    {
        self.map_with(source, destination, Coverage::Full)
    }

    /// Map into a fresh `D::default()`.
    pub fn map_into<S, D>(&self, source: &S) -> Result<D, MappingError>
    where
        S: Serialize + 'static,
        D: Serialize + DeserializeOwned + Default + 'static,
    {
        let mut destination = D::default();
        self.map(source, &mut destination)?;
        Ok(destination)
    }

    /// Map every element of `sources` into a newly allocated vector.
    ///
    /// `destination` is only replaced once every element has been mapped; the
    /// first element failure is returned as is.
    pub fn map_many<S, D>(&self, sources: &[S], destination: &mut Vec<D>) -> Result<(), MappingError>
    where
        S: Serialize + 'static,
        D: Serialize + DeserializeOwned + Default + 'static,
    {
        let mut mapped = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let mut item = D::default();
            if let Err(e) = self.map(source, &mut item) {
                debug!(index, error = %e, "element mapping failed");
                return Err(e);
            }
            mapped.push(item);
        }
        *destination = mapped;
        Ok(())
    }

    /// Whether a rule overrides the `S -> D` pair.
    pub fn has_rule<S: 'static, D: 'static>(&self) -> bool {
        self.rules
            .contains_key(&(TypeId::of::<S>(), TypeId::of::<D>()))
    }

    fn map_with<S, D>(
        &self,
        source: &S,
        destination: &mut D,
        coverage: Coverage,
    ) -> Result<(), MappingError>
    where
        S: Serialize + 'static,
        D: Serialize + DeserializeOwned + 'static,
    {
        if let Some(rule) = self.rules.get(&(TypeId::of::<S>(), TypeId::of::<D>())) {
            debug!(from = rule.from, to = rule.to, "applying mapping rule");
            return (rule.apply)(source as &dyn Any, destination as &mut dyn Any);
        }
        copy_fields(source, destination, coverage)
    }
}

fn copy_fields<S, D>(source: &S, destination: &mut D, coverage: Coverage) -> Result<(), MappingError>
where
    S: Serialize,
    D: Serialize + DeserializeOwned,
{
    let from = type_name::<S>();
    let to = type_name::<D>();

    let Value::Object(source_fields) = serde_json::to_value(source)? else {
        return Err(MappingError::InvalidSource(from));
    };
    let Value::Object(mut fields) = serde_json::to_value(&*destination)? else {
        return Err(MappingError::InvalidDestination(to));
    };

    let names: Vec<String> = match struct_fields::<D>() {
        Some(declared) => declared.iter().map(|name| (*name).to_owned()).collect(),
        None => fields.keys().cloned().collect(),
    };
    for name in names {
        let Some(value) = source_fields.get(&name) else {
            if coverage == Coverage::Full {
                return Err(MappingError::MissingField {
                    from,
                    to,
                    field: name,
                });
            }
            continue;
        };

        let previous = fields.insert(name.clone(), value.clone());
        if serde_json::from_value::<D>(Value::Object(fields.clone())).is_ok() {
            continue;
        }

        // Not assignable: put the destination's own value back.
        debug!(field = %name, from, to, "skipping field with incompatible type");
        match previous {
            Some(previous) => fields.insert(name.clone(), previous),
            None => fields.remove(&name),
        };
        if coverage == Coverage::Full {
            return Err(MappingError::MissingField {
                from,
                to,
                field: name,
            });
        }
    }

    *destination = serde_json::from_value(Value::Object(fields))?;
    Ok(())
}

/// Field names a struct-like `D` declares to its deserializer, or `None` for
/// shapes that deserialize from a map (e.g. `#[serde(flatten)]`).
fn struct_fields<D: DeserializeOwned>() -> Option<&'static [&'static str]> {
    struct Introspect<'a>(&'a mut Option<&'static [&'static str]>);

    impl<'de> Deserializer<'de> for Introspect<'_> {
        type Error = de::value::Error;

        fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
            Err(de::Error::custom("not a struct"))
        }

        fn deserialize_struct<V: Visitor<'de>>(
            self,
            _name: &'static str,
            fields: &'static [&'static str],
            _visitor: V,
        ) -> Result<V::Value, Self::Error> {
            *self.0 = Some(fields);
            Err(de::Error::custom("fields captured"))
        }

        serde::forward_to_deserialize_any! {
            bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
            bytes byte_buf option unit unit_struct newtype_struct seq tuple
            tuple_struct map enum identifier ignored_any
        }
    }

    let mut fields = None;
    // Always an error: the introspector never produces a value.
    let _ = D::deserialize(Introspect(&mut fields));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct SourceUser {
        id: i64,
        name: String,
        email: String,
        age: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct DestinationUser {
        id: i64,
        name: String,
        email: String,
        age: u32,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Contact {
        id: i64,
        email: String,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct ContactWithExtra {
        id: i64,
        email: String,
        extra: String,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct RenamedUser {
        id: i64,
        full_name: String,
        email: String,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct TextualAge {
        email: String,
        age: String,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Grant {
        token: String,
        refresh: Option<String>,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct SparseGrant {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh: Option<String>,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct SparseExtra {
        id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra: Option<String>,
    }

    fn john() -> SourceUser {
        SourceUser {
            id: 1,
            name: "John Doe".into(),
            email: "john@example.com".into(),
            age: 30,
        }
    }

    #[test]
    fn identical_shapes_round_trip() {
        let mapper = Mapper::builder().build();
        let a = john();

        let mut b = DestinationUser::default();
        mapper.map(&a, &mut b).unwrap();
        let mut a2 = SourceUser::default();
        mapper.map(&b, &mut a2).unwrap();

        assert_eq!(a2, a);
    }

    #[test]
    fn unmatched_destination_field_keeps_zero_value() {
        let mapper = Mapper::builder().build();
        let source = Contact {
            id: 7,
            email: "ana@x.com".into(),
        };

        let mut dest = ContactWithExtra::default();
        mapper.map(&source, &mut dest).unwrap();

        assert_eq!(dest.id, 7);
        assert_eq!(dest.email, "ana@x.com");
        assert!(dest.extra.is_empty());
    }

    #[test]
    fn field_skipped_on_serialization_is_still_copied() {
        let mapper = Mapper::builder().build();
        let source = Grant {
            token: "a".into(),
            refresh: Some("r".into()),
        };

        let lenient: SparseGrant = mapper.map_into(&source).unwrap();
        assert_eq!(lenient.refresh.as_deref(), Some("r"));

        let mut strict = SparseGrant::default();
        mapper.map_strict(&source, &mut strict).unwrap();
        assert_eq!(strict.token, "a");
        assert_eq!(strict.refresh.as_deref(), Some("r"));
    }

    #[test]
    fn strict_mapping_reports_field_skipped_on_serialization() {
        let mapper = Mapper::builder().build();
        let source = Contact {
            id: 7,
            email: "ana@x.com".into(),
        };

        let mut dest = SparseExtra::default();
        let err = mapper.map_strict(&source, &mut dest).unwrap_err();
        match err {
            MappingError::MissingField { field, .. } => assert_eq!(field, "extra"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn renamed_field_is_not_copied_by_default() {
        let mapper = Mapper::builder().build();
        let dest: RenamedUser = mapper.map_into(&john()).unwrap();
        assert_eq!(dest.id, 1);
        assert_eq!(dest.email, "john@example.com");
        assert!(dest.full_name.is_empty());
    }

    #[test]
    fn incompatible_field_type_is_skipped() {
        let mapper = Mapper::builder().build();
        let dest: TextualAge = mapper.map_into(&john()).unwrap();
        assert_eq!(dest.email, "john@example.com");
        assert!(dest.age.is_empty());
    }

    #[test]
    fn registered_rule_overrides_default_copy() {
        let mapper = Mapper::builder()
            .rule(|source: &SourceUser, dest: &mut RenamedUser| {
                dest.id = source.id;
                dest.full_name = source.name.clone();
                Ok(())
            })
            .build();

        let dest: RenamedUser = mapper.map_into(&john()).unwrap();
        assert_eq!(dest.full_name, "John Doe");
        // The rule owns the conversion: email is not filled in behind its back.
        assert!(dest.email.is_empty());
        assert!(mapper.has_rule::<SourceUser, RenamedUser>());
        assert!(!mapper.has_rule::<RenamedUser, SourceUser>());
    }

    #[test]
    fn later_rule_registration_wins() {
        let mapper = Mapper::builder()
            .rule(|_: &SourceUser, dest: &mut RenamedUser| {
                dest.full_name = "first".into();
                Ok(())
            })
            .rule(|_: &SourceUser, dest: &mut RenamedUser| {
                dest.full_name = "second".into();
                Ok(())
            })
            .build();

        let dest: RenamedUser = mapper.map_into(&john()).unwrap();
        assert_eq!(dest.full_name, "second");
    }

    #[test]
    fn non_struct_destination_is_rejected() {
        let mapper = Mapper::builder().build();
        let mut dest = String::new();
        let err = mapper.map(&john(), &mut dest).unwrap_err();
        assert!(matches!(err, MappingError::InvalidDestination(_)));
    }

    #[test]
    fn non_struct_source_is_rejected() {
        let mapper = Mapper::builder().build();
        let mut dest = DestinationUser::default();
        let err = mapper.map(&42_u32, &mut dest).unwrap_err();
        assert!(matches!(err, MappingError::InvalidSource(_)));
    }

    #[test]
    fn strict_mapping_reports_missing_field() {
        let mapper = Mapper::builder().build();
        let source = Contact {
            id: 7,
            email: "ana@x.com".into(),
        };

        let mut dest = ContactWithExtra::default();
        let err = mapper.map_strict(&source, &mut dest).unwrap_err();
        match err {
            MappingError::MissingField { field, .. } => assert_eq!(field, "extra"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_mapping_accepts_full_coverage() {
        let mapper = Mapper::builder().build();
        let mut dest = DestinationUser::default();
        mapper.map_strict(&john(), &mut dest).unwrap();
        assert_eq!(dest.name, "John Doe");
    }

    #[test]
    fn map_many_maps_every_element() {
        let mapper = Mapper::builder().build();
        let mut jane = john();
        jane.id = 2;
        jane.name = "Jane Doe".into();
        let sources = vec![john(), jane];

        let mut dest: Vec<DestinationUser> = Vec::new();
        mapper.map_many(&sources, &mut dest).unwrap();

        assert_eq!(dest.len(), 2);
        assert_eq!(dest[0].name, "John Doe");
        assert_eq!(dest[1].id, 2);
        assert_eq!(dest[1].name, "Jane Doe");
    }

    #[test]
    fn map_many_failure_commits_nothing() {
        let mapper = Mapper::builder()
            .rule(|source: &SourceUser, dest: &mut DestinationUser| {
                if source.age > 100 {
                    return Err(MappingError::rule::<SourceUser, DestinationUser>(
                        "implausible age",
                    ));
                }
                dest.id = source.id;
                Ok(())
            })
            .build();
        let mut old = john();
        old.age = 200;
        let sources = vec![john(), old];

        let sentinel = DestinationUser {
            id: 99,
            ..Default::default()
        };
        let mut dest = vec![sentinel.clone()];
        let err = mapper.map_many(&sources, &mut dest).unwrap_err();

        assert!(matches!(err, MappingError::Rule { .. }));
        assert_eq!(dest, vec![sentinel]);
    }
}
