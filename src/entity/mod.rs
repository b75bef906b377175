pub mod audit;
pub mod batch;
pub mod code;
pub mod pro_user;

pub use audit::AuditAction;
pub use code::CodeType;
