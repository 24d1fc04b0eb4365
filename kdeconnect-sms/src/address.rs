//! Store addresses and the strategies that pick between their variants.
//!
//! Older platforms only expose the message store through undocumented
//! content URIs. From API level 19 (KitKat) onwards the documented URIs are
//! available. The choice is made once, by the resolver handed to the
//! accessor, and is never retried with the other variant.

use std::fmt;

/// First API level exposing the documented telephony provider URIs.
pub const KITKAT_API_LEVEL: u32 = 19;

/// Which logical store an address points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressScope {
    /// One row per message.
    Messages,
    /// One representative row per thread.
    Conversations,
}

/// Documented or legacy flavour of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressVariant {
    Modern,
    Legacy,
}

/// A resolved logical address in the message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreAddress {
    pub scope: AddressScope,
    pub variant: AddressVariant,
}

impl StoreAddress {
    pub const fn new(scope: AddressScope, variant: AddressVariant) -> Self {
        Self { scope, variant }
    }

    /// Content URI for this address.
    pub const fn uri(&self) -> &'static str {
        match (self.scope, self.variant) {
            (AddressScope::Messages, AddressVariant::Modern) => "content://sms",
            (AddressScope::Messages, AddressVariant::Legacy) => "content://sms/",
            (AddressScope::Conversations, AddressVariant::Modern) => "content://sms/conversations",
            (AddressScope::Conversations, AddressVariant::Legacy) => {
                "content://sms/conversations/"
            }
        }
    }

    /// Parse one of the four known content URIs.
    pub fn from_uri(uri: &str) -> Option<Self> {
        [AddressScope::Messages, AddressScope::Conversations]
            .into_iter()
            .flat_map(|scope| {
                [AddressVariant::Modern, AddressVariant::Legacy]
                    .into_iter()
                    .map(move |variant| Self::new(scope, variant))
            })
            .find(|address| address.uri() == uri)
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// Strategy producing the addresses an accessor queries.
pub trait AddressResolver: Send + Sync {
    /// Variant to use for every address this resolver produces.
    fn variant(&self) -> AddressVariant;

    /// Address of the per-message store.
    fn message_store_address(&self) -> StoreAddress {
        StoreAddress::new(AddressScope::Messages, self.variant())
    }

    /// Address of the per-conversation store.
    fn conversation_store_address(&self) -> StoreAddress {
        StoreAddress::new(AddressScope::Conversations, self.variant())
    }
}

impl<T: AddressResolver + ?Sized> AddressResolver for Box<T> {
    fn variant(&self) -> AddressVariant {
        (**self).variant()
    }
}

/// Picks the variant from the platform's reported API level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformResolver {
    api_level: u32,
}

impl PlatformResolver {
    pub const fn new(api_level: u32) -> Self {
        Self { api_level }
    }

    pub const fn api_level(&self) -> u32 {
        self.api_level
    }
}

impl AddressResolver for PlatformResolver {
    fn variant(&self) -> AddressVariant {
        if self.api_level >= KITKAT_API_LEVEL {
            AddressVariant::Modern
        } else {
            AddressVariant::Legacy
        }
    }
}

/// Always resolves to one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedResolver(pub AddressVariant);

impl AddressResolver for FixedResolver {
    fn variant(&self) -> AddressVariant {
        self.0
    }
}
