/// Comparison capabilities for one reconciled list item.
///
/// The engine never inspects item contents directly; everything it needs is
/// expressed through this trait:
/// * a renderer type tag ([`kind`](DiffItem::kind)),
/// * a stable identity independent of object identity
///   ([`identity`](DiffItem::identity)),
/// * content equality for identity-matched pairs
///   ([`same_content`](DiffItem::same_content)),
/// * a minimal change payload for partial re-renders
///   ([`payload_delta`](DiffItem::payload_delta)).
pub trait DiffItem: Clone + Send + Sync + 'static {
	/// Stable identity key. Two items representing the same logical entry
	/// must return equal keys even when their contents differ.
	type Key: PartialEq + Send + Sync;

	/// Partial-change payload carried by `Change` ops. `None` means the
	/// consumer must re-render the item wholesale.
	type Payload: Clone + PartialEq + Send + Sync + 'static;

	/// Renderer type tag. Items with different tags never identity-match.
	fn kind(&self) -> u32;

	/// Returns the stable identity key.
	fn identity(&self) -> Self::Key;

	/// Whether the rendered content of two identity-matched items is
	/// identical. Only called for pairs that already identity-match.
	fn same_content(&self, other: &Self) -> bool;

	/// Minimal payload describing what changed from `self` to `newer`.
	/// Only called for identity-matched pairs whose content differs.
	fn payload_delta(&self, newer: &Self) -> Option<Self::Payload>;
}

/// True when both items carry the same type tag and the same identity key.
pub fn same_identity<T: DiffItem>(a: &T, b: &T) -> bool {
	a.kind() == b.kind() && a.identity() == b.identity()
}
