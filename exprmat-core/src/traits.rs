//! Core trait definitions shared by the model and matrix crates.

/// A type that carries a human-readable name.
pub trait Named {
    /// The name, if the entity has one.
    fn name(&self) -> Option<&str>;
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
