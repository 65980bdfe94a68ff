//! Loading experiment tables from a data warehouse.
//!
//! A [`QuerySource`] turns a query string into an
//! [`ObservationTable`](expeval_table::ObservationTable). [`CommandSource`]
//! delegates to an external client program; [`CachedQuery`] wraps any source
//! with a read-through file cache so repeated analyses do not hit the
//! warehouse again.

pub use self::{
    cache::{CachedQuery, DEFAULT_DATE_FORMAT, FetchError},
    source::{CommandSource, QueryError, QuerySource},
};

mod cache;
mod source;
