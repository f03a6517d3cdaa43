//! Domain vocabulary shared by the console access layer: request context,
//! resolved access details, environment items, resource lists, entities and
//! the numbered error taxonomy.

pub mod access;
pub mod context;
pub mod env;
pub mod error;
pub mod list;
pub mod model;
pub mod resource;

pub use access::AccessDetails;
pub use context::{Principal, RequestContext};
pub use env::{EnvItem, RefKind};
pub use error::{
    Cause, DomainError, ErrorKind, ErrorTier, FailureReason, Result, ResultExt,
};
pub use list::{Created, ListMetadata, ResourceList, UNKNOWN_TIMESTAMP, timestamp_millis};
pub use model::*;
pub use resource::{ApiGroup, Operation, ResourceKind};

pub mod prelude {
    pub use crate::{
        AccessDetails, DomainError, EnvItem, ErrorKind, ErrorTier, Operation, RefKind,
        RequestContext, ResourceKind, ResourceList, Result, ResultExt,
    };
}
