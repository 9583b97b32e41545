//! Sessions and persisters for lazyorm.
//!
//! A [`SessionFactory`] owns the SQLite connection and one [`SqlitePersister`]
//! per registered entity type. [`Session`]s load and write entities and bind
//! the interceptors of the entities they load, so lazy properties can be
//! fetched on first access while the session is open.

mod config;
mod error;
mod factory;
mod persister;
mod session;

pub use config::FactoryConfig;
pub use error::{SessionError, SessionResult};
pub use factory::SessionFactory;
pub use persister::SqlitePersister;
pub use session::Session;
