//! Connection registry: per-entity and default connections and providers.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::connection::Connection;
use crate::entity::Entity;
use crate::error::{Error, Result};

/// A factory for connections, consulted lazily the first time an entity
/// type needs one.
pub trait ConnectionProvider {
    /// Opens (or hands out) a connection.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure as an opaque connection error.
    fn connect(&self) -> Result<Rc<dyn Connection>>;
}

/// The connection registry every database operation goes through.
///
/// Connections and providers can be registered per entity type or as a
/// crate-wide default. Resolution order for an entity: its own connection,
/// then the default connection, then its own provider falling back to the
/// default provider. A provider-opened connection is cached under the
/// entity type, so the provider runs at most once per type.
///
/// `Db` holds `Rc` handles and interior mutability via `RefCell`; it is
/// deliberately single-threaded. Each thread owns its own registry.
#[derive(Default)]
pub struct Db {
    connections: RefCell<HashMap<TypeId, Rc<dyn Connection>>>,
    providers: HashMap<TypeId, Rc<dyn ConnectionProvider>>,
    default_connection: RefCell<Option<Rc<dyn Connection>>>,
    default_provider: Option<Rc<dyn ConnectionProvider>>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("connections", &self.connections.borrow().len())
            .field("providers", &self.providers.len())
            .field("has_default_connection", &self.default_connection.borrow().is_some())
            .field("has_default_provider", &self.default_provider.is_some())
            .finish()
    }
}

impl Db {
    /// An empty registry with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the default connection used by entity types without one
    /// of their own.
    pub fn set_connection(&self, connection: Rc<dyn Connection>) {
        *self.default_connection.borrow_mut() = Some(connection);
    }

    /// Registers a connection for one entity type.
    pub fn set_connection_for<E: Entity>(&self, connection: Rc<dyn Connection>) {
        self.connections.borrow_mut().insert(TypeId::of::<E>(), connection);
    }

    /// Registers the default provider.
    pub fn set_provider(&mut self, provider: Rc<dyn ConnectionProvider>) {
        self.default_provider = Some(provider);
    }

    /// Registers a provider for one entity type.
    pub fn set_provider_for<E: Entity>(&mut self, provider: Rc<dyn ConnectionProvider>) {
        self.providers.insert(TypeId::of::<E>(), provider);
    }

    /// Resolves the connection for an entity type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when neither a connection nor a
    /// provider is registered, or the provider's failure when opening.
    pub fn connection<E: Entity>(&self) -> Result<Rc<dyn Connection>> {
        let type_id = TypeId::of::<E>();
        if let Some(conn) = self.connections.borrow().get(&type_id) {
            return Ok(Rc::clone(conn));
        }
        if let Some(conn) = self.default_connection.borrow().as_ref() {
            return Ok(Rc::clone(conn));
        }
        let provider = self
            .providers
            .get(&type_id)
            .or(self.default_provider.as_ref())
            .ok_or_else(|| Error::configuration("connection provider is not set"))?;
        let conn = provider.connect()?;
        self.connections.borrow_mut().insert(type_id, Rc::clone(&conn));
        Ok(conn)
    }

    /// Drops every cached and registered connection and provider.
    pub fn reset(&mut self) {
        self.connections.borrow_mut().clear();
        self.providers.clear();
        *self.default_connection.borrow_mut() = None;
        self.default_provider = None;
    }
}
