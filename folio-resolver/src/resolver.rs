use crate::ResolverResult;
use async_trait::async_trait;
use folio_types::{Account, EntryReference};

/// Converts between references of one entry type and the entries themselves.
///
/// Each resolver claims exactly one reference type (the `type` half of an
/// [`EntryReference`]) and one Rust entry type. The registry refuses to
/// register two resolvers that claim the same either.
#[async_trait]
pub trait EntryResolver: Send + Sync + 'static {
    /// The entry type produced by [`resolve`](Self::resolve).
    type Entry: Send + Sync + 'static;

    /// The reference type this resolver claims, e.g. `"work"`.
    fn entry_type(&self) -> &str;

    /// Whether this resolver can handle `reference`.
    ///
    /// The default accepts every reference of [`entry_type`](Self::entry_type).
    /// Override to additionally reject ids the backing repository could never
    /// hold.
    fn accepts(&self, reference: &EntryReference) -> bool {
        reference.entry_type == self.entry_type()
    }

    /// Fetches the referenced entry.
    async fn resolve(
        &self,
        account: Option<&Account>,
        reference: &EntryReference,
    ) -> ResolverResult<Self::Entry>;

    /// Builds the canonical reference for `entry`.
    fn make_reference(&self, entry: &Self::Entry) -> EntryReference;
}
