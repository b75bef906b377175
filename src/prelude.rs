pub use std::sync::Arc;

pub use chrono::{NaiveDateTime as DateTime, TimeDelta, Utc};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database,
  DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
  Set, TransactionTrait,
};
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
