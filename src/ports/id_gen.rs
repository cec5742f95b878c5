//! ID generator port for producing unique row identifiers.

/// Generates unique identifiers for link and cache rows.
///
/// Abstracting ID generation lets tests substitute a predictable sequence.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
