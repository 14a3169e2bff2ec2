//! Hops: the machines a connection is routed through.
//!
//! The tracer only needs a stable identity, a kind, a map location, and the
//! connect/disconnect notifications. [`Computer`] is the stock
//! implementation; [`Network`] owns every hop in the world and resolves ids
//! through the [`HopRegistry`] trait.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use tracing::trace;

use downlink_types::{HopId, HopKind, Point};

/// A machine that can sit on a connection's route.
pub trait Hop: fmt::Debug + Send {
    /// Stable identity, used for route digests and persistence.
    fn id(&self) -> HopId;

    /// What kind of machine this is.
    fn kind(&self) -> HopKind;

    /// Where the hop sits on the world map, if placed.
    fn location(&self) -> Option<Point>;

    /// A connection routed through this hop has opened.
    fn connect(&mut self);

    /// A connection routed through this hop has closed.
    fn disconnect(&mut self);
}

/// Resolves hop ids to hops.
pub trait HopRegistry {
    /// Look up a hop.
    fn hop(&self, id: HopId) -> Option<&dyn Hop>;

    /// Look up a hop mutably.
    fn hop_mut(&mut self, id: HopId) -> Option<&mut dyn Hop>;
}

// ---------------------------------------------------------------------------
// Computer
// ---------------------------------------------------------------------------

/// A networked computer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computer {
    id: HopId,
    name: String,
    address: String,
    location: Option<Point>,
    kind: HopKind,
    /// Number of open connections routed through this computer.
    open_connections: u32,
}

impl Computer {
    /// Create a computer with a random dotted-quad address.
    pub fn new<R: Rng + ?Sized>(name: impl Into<String>, kind: HopKind, rng: &mut R) -> Self {
        Self::with_address(name, kind, random_address(rng))
    }

    /// Create a computer with a known address.
    pub fn with_address(name: impl Into<String>, kind: HopKind, address: impl Into<String>) -> Self {
        Self {
            id: HopId::new(),
            name: name.into(),
            address: address.into(),
            location: None,
            kind,
            open_connections: 0,
        }
    }

    /// Place the computer on the map.
    #[must_use]
    pub fn at(mut self, location: Point) -> Self {
        self.location = Some(location);
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether at least one connection is routed through this computer.
    pub const fn is_connected(&self) -> bool {
        self.open_connections > 0
    }
}

impl Hop for Computer {
    fn id(&self) -> HopId {
        self.id
    }

    fn kind(&self) -> HopKind {
        self.kind
    }

    fn location(&self) -> Option<Point> {
        self.location
    }

    fn connect(&mut self) {
        self.open_connections = self.open_connections.saturating_add(1);
        trace!(hop = %self.id, name = %self.name, "hop connected");
    }

    fn disconnect(&mut self) {
        self.open_connections = self.open_connections.saturating_sub(1);
        trace!(hop = %self.id, name = %self.name, "hop disconnected");
    }
}

/// A random IPv4 address in dotted-quad form.
pub fn random_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    let octets: [u8; 4] = rng.random();
    let [a, b, c, d] = octets;
    format!("{a}.{b}.{c}.{d}")
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Every hop in the world, keyed by id.
#[derive(Debug, Default)]
pub struct Network {
    hops: BTreeMap<HopId, Box<dyn Hop>>,
}

impl Network {
    /// Create an empty network.
    pub const fn new() -> Self {
        Self {
            hops: BTreeMap::new(),
        }
    }

    /// Add a hop and return its id.
    pub fn insert<H: Hop + 'static>(&mut self, hop: H) -> HopId {
        let id = hop.id();
        self.hops.insert(id, Box::new(hop));
        id
    }

    /// Remove a hop, returning it.
    pub fn remove(&mut self, id: HopId) -> Option<Box<dyn Hop>> {
        self.hops.remove(&id)
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Whether the network has no hops.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Ids of every hop of `kind`, in id order.
    pub fn ids_of_kind(&self, kind: HopKind) -> Vec<HopId> {
        self.hops
            .values()
            .filter(|hop| hop.kind() == kind)
            .map(|hop| hop.id())
            .collect()
    }
}

impl HopRegistry for Network {
    fn hop(&self, id: HopId) -> Option<&dyn Hop> {
        self.hops.get(&id).map(|hop| &**hop)
    }

    fn hop_mut(&mut self, id: HopId) -> Option<&mut dyn Hop> {
        let hop = self.hops.get_mut(&id)?;
        Some(hop.as_mut())
    }
}
