//! Binds [`LabelPath`] to `sea_orm`/`sea_query` as a text-represented
//! value, so a column backed by Postgres `ltree` round-trips through
//! the same type the rest of the codebase uses — never through a bare
//! `String` (see the module doc for why that distinction matters).

use sea_orm::sea_query::{ArrayType, ColumnType, Value, ValueType, ValueTypeErr};
use sea_orm::{QueryResult, TryGetError, TryGetable};

use crate::LabelPath;

impl From<LabelPath> for Value {
    fn from(path: LabelPath) -> Self {
        Value::String(Some(Box::new(path.to_string())))
    }
}

impl ValueType for LabelPath {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(s)) => LabelPath::parse(&s).map_err(|_| ValueTypeErr),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "LabelPath".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        // ltree has no first-class sea-query variant; the migration
        // layer casts this column's DDL to `ltree` explicitly and
        // relies on Postgres's implicit text <-> ltree coercion for
        // reads/writes issued through this binding.
        ColumnType::custom("ltree")
    }
}

impl TryGetable for LabelPath {
    fn try_get_by<I: sea_orm::ColIdx>(res: &QueryResult, idx: I) -> Result<Self, TryGetError> {
        let s: String = res.try_get_by(idx).map_err(TryGetError::DbErr)?;
        LabelPath::parse(&s).map_err(|e| {
            TryGetError::DbErr(sea_orm::DbErr::Type(format!("invalid label path `{s}`: {e}")))
        })
    }
}
