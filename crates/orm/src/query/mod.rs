//! Query Builder Module - fluent, column oriented query building

pub mod builder;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use sql_generation::QueryGrammar;
pub use types::{
    qualify, unqualified, JoinClause, JoinType, OrderDirection, QueryOperator, SelectColumn,
    WhereBoolean, WhereCondition,
};
