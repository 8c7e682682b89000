/// Router Module Index
///
/// Splits the gateway's routing into what it answers itself and what it hands to
/// the page renderer. The access router is layered over both, but only acts on
/// paths inside the dashboard zones.

/// Endpoints served by the gateway directly (health, session lookup).
pub mod public;

/// Catch-all forwarding to the page renderer. Dashboard zones are gated by the
/// access router before they get here.
pub mod pages;
